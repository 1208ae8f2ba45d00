use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::{GuideError, Result},
    services::completion::{Completion, CompletionClient, CompletionRequest, TokenUsage},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI-compatible chat-completion client. One HTTP request per call, no retries.
#[derive(Clone, Debug)]
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The core sets no deadline; callers at the request boundary may.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        self.http = builder
            .build()
            .map_err(|err| GuideError::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "n": 1,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let request_url = build_chat_url(&self.base_url);
        debug!(
            target: "itinerary::client",
            url = %request_url,
            model = %self.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .http
            .post(&request_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let response_text = response.text().await.map_err(transport_error)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GuideError::RateLimit {
                retry_after: retry_after.unwrap_or(1).max(1),
            });
        }

        let response_json: Option<Value> = serde_json::from_str(&response_text).ok();

        if !status.is_success() {
            let message = response_json
                .as_ref()
                .and_then(api_error_message)
                .unwrap_or(response_text);
            return Err(GuideError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_json = response_json.ok_or_else(|| GuideError::Api {
            status: status.as_u16(),
            message: "completion response was not JSON".to_string(),
        })?;

        if let Some(message) = api_error_message(&response_json) {
            return Err(GuideError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(&response_json)
    }
}

fn transport_error(err: reqwest::Error) -> GuideError {
    if err.is_timeout() {
        GuideError::Timeout(format!("completion request timed out: {err}"))
    } else {
        GuideError::Http(err.to_string())
    }
}

fn api_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}

/// Pull the first candidate's text out of a chat-completion body.
pub(crate) fn parse_completion(body: &Value) -> Result<Completion> {
    let content = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or(GuideError::EmptyResponse)?;

    let usage = body.get("usage").and_then(|usage| {
        Some(TokenUsage {
            prompt_tokens: u32::try_from(usage.get("prompt_tokens")?.as_u64()?).ok()?,
            completion_tokens: u32::try_from(usage.get("completion_tokens")?.as_u64()?).ok()?,
            total_tokens: u32::try_from(usage.get("total_tokens")?.as_u64()?).ok()?,
        })
    });

    Ok(Completion {
        content: content.to_string(),
        usage,
        model: body.get("model").and_then(Value::as_str).map(str::to_string),
    })
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}
