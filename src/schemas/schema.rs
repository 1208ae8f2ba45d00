use schemars::schema::{RootSchema, Schema, SchemaObject};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{any::TypeId, sync::Arc};

/// Cached JSON schema for a type the model is asked to produce.
#[derive(Clone, Debug)]
pub struct SchemaHandle {
    schema_name: &'static str,
    type_name: &'static str,
    type_id: TypeId,
    schema_json: Arc<Value>,
}

impl SchemaHandle {
    pub fn from_root_schema<T: 'static>(
        schema_name: &'static str,
        type_name: &'static str,
        root: RootSchema,
    ) -> Self {
        // RootSchema always serializes. A Null here would be rejected at runtime
        // when validate_against_schema compiles it with jsonschema.
        let schema_json = serde_json::to_value(root).unwrap_or(Value::Null);

        Self {
            schema_name,
            type_name,
            type_id: TypeId::of::<T>(),
            schema_json: Arc::new(schema_json),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn schema_json(&self) -> &Value {
        self.schema_json.as_ref()
    }

    /// Top-level property names the schema marks as required.
    pub fn required_keys(&self) -> Vec<&str> {
        self.schema_json
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Implemented by `#[completion_schema]` for types decoded from model output.
pub trait CompletionSchema: DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static SchemaHandle;
}

/// Copy doc comments captured by the procedural macro into the schema metadata.
pub fn apply_doc_comments(
    root: &mut RootSchema,
    title: &'static str,
    description: Option<&'static str>,
    field_docs: &[(&'static str, &'static str)],
) {
    let schema_object: &mut SchemaObject = &mut root.schema;

    let metadata = schema_object.metadata();
    metadata.title.get_or_insert_with(|| title.to_string());
    if let Some(description) = description {
        metadata
            .description
            .get_or_insert_with(|| description.to_string());
    }

    let Some(object) = schema_object.object.as_mut() else {
        return;
    };
    for (field, doc) in field_docs {
        if let Some(Schema::Object(property)) = object.properties.get_mut(*field) {
            property
                .metadata()
                .description
                .get_or_insert_with(|| (*doc).to_string());
        }
    }
}
