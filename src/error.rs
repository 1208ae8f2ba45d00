use thiserror::Error;

/// Main error type for itinerary generation
#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid trip request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Completion API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Completion response contained no text")]
    EmptyResponse,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GuideError>;

impl GuideError {
    /// Whether re-submitting the same request could plausibly succeed.
    ///
    /// Nothing in the crate retries on its own; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            GuideError::Api { status, .. } => *status >= 500,
            GuideError::Http(_) => true,
            GuideError::RateLimit { .. } => true,
            GuideError::Timeout(_) => true,
            GuideError::EmptyResponse => true,
            _ => false,
        }
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            GuideError::Config(_) => "CONFIG_ERROR",
            GuideError::InvalidRequest(_) => "INVALID_REQUEST",
            GuideError::Http(_) => "HTTP_ERROR",
            GuideError::Api { .. } => "COMPLETION_API_ERROR",
            GuideError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            GuideError::Timeout(_) => "TIMEOUT_ERROR",
            GuideError::EmptyResponse => "EMPTY_RESPONSE",
            GuideError::Serialization(_) => "SERIALIZATION_ERROR",
            GuideError::Validation(_) => "VALIDATION_ERROR",
            GuideError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}
