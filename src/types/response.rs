use serde_json::Value;

use crate::{
    error::{GuideError, Result},
    schemas::{validate_against_schema, CompletionSchema},
};

/// Schema-check a decoded payload, then deserialize it with path-aware errors.
pub fn decode_structured<T>(payload: &Value) -> Result<T>
where
    T: CompletionSchema,
{
    let schema = T::schema();
    validate_against_schema(schema, payload)?;

    serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        GuideError::Validation(format!(
            "failed to deserialize `{}` at {}: {}",
            schema.schema_name(),
            location,
            err.into_inner()
        ))
    })
}
