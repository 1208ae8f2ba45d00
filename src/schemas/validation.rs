use crate::{error::GuideError, schemas::SchemaHandle};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

const MAX_SCHEMA_ERRORS: usize = 3;

/// Check a decoded model payload against a schema, summarising the first few violations.
pub fn validate_against_schema(schema: &SchemaHandle, payload: &Value) -> Result<(), GuideError> {
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            GuideError::Validation(format!(
                "Failed to prepare `{}` schema for validation: {}",
                schema.schema_name(),
                err
            ))
        })?;

    let Err(errors) = validator.validate(payload) else {
        return Ok(());
    };

    let mut details = Vec::new();
    let mut truncated = false;
    for (idx, error) in errors.enumerate() {
        if idx == MAX_SCHEMA_ERRORS {
            truncated = true;
            break;
        }
        let mut path = error.instance_path.to_string();
        if path.is_empty() {
            path = "<root>".to_string();
        }
        details.push(format!("{}: {}", path, error));
    }

    let mut detail_str = if details.is_empty() {
        "payload failed schema validation".to_string()
    } else {
        details.join("; ")
    };
    if truncated {
        detail_str.push_str("; additional errors truncated");
    }

    Err(GuideError::Validation(format!(
        "Payload does not match `{}` schema: {}",
        schema.schema_name(),
        detail_str
    )))
}
