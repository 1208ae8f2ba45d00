mod completion_schema;
mod schema_extraction;

use proc_macro::TokenStream;

/// Derives an `itinerary_rs::schema::CompletionSchema` impl for a named struct.
///
/// The struct must also derive `schemars::JsonSchema` and `serde::Deserialize`.
/// Doc comments on the struct and its fields are copied into the generated
/// JSON Schema, keyed by the serialized (`#[serde(rename = "...")]`) field name.
///
/// Accepts optional `name = "..."` and `description = "..."` arguments.
#[proc_macro_attribute]
pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    completion_schema::completion_schema(attr, item)
}
