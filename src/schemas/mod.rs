//! JSON Schema contracts for model output.

pub mod schema;
pub mod validation;

pub use schema::{apply_doc_comments, CompletionSchema, SchemaHandle};
pub use validation::validate_against_schema;
