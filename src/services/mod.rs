pub mod completion;
pub mod extractor;
pub mod guide_validator;
pub mod openai_client;
pub mod prompt_builder;

pub use completion::{ChatMessage, Completion, CompletionClient, CompletionRequest, Role, TokenUsage};
pub use extractor::extract_json_candidate;
pub use guide_validator::{GuideValidator, ValidationPolicy};
pub use openai_client::OpenAiCompletionClient;
pub use prompt_builder::{build_prompt, GuidePrompt};
