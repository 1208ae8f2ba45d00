use crate::{
    error::{GuideError, Result},
    services::{
        guide_validator::ValidationPolicy,
        openai_client::{OpenAiCompletionClient, DEFAULT_BASE_URL, DEFAULT_MODEL},
    },
};
use std::{fmt, str::FromStr, time::Duration};

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 3000,
        }
    }
}

/// Process-wide settings, loaded once and handed to the pipeline.
#[derive(Clone, PartialEq)]
pub struct GuideConfig {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Option<Duration>,
    settings: GenerationSettings,
    policy: ValidationPolicy,
}

impl fmt::Debug for GuideConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuideConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .finish()
    }
}

impl GuideConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
            settings: GenerationSettings::default(),
            policy: ValidationPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GuideConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = var("OPENAI_API_KEY").ok_or_else(|| {
            GuideError::Config(
                "OPENAI_API_KEY environment variable must be set before creating a pipeline"
                    .to_string(),
            )
        })?;
        let mut config = Self::new(api_key);

        if let Some(base_url) = var("OPENAI_BASE_URL").or_else(|| var("OPENROUTER_BASE_URL")) {
            config.base_url = base_url;
        }
        if let Some(model) = var("ITINERARY_MODEL") {
            config.model = model;
        }
        if let Some(temperature) = var("ITINERARY_TEMPERATURE") {
            config.settings.temperature = parse_var("ITINERARY_TEMPERATURE", &temperature)?;
        }
        if let Some(max_tokens) = var("ITINERARY_MAX_TOKENS") {
            config.settings.max_tokens = parse_var("ITINERARY_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(strict) = var("ITINERARY_STRICT_TOTAL") {
            config.policy.strict_total = parse_flag("ITINERARY_STRICT_TOTAL", &strict)?;
        }
        if let Some(strict) = var("ITINERARY_STRICT_DAYS") {
            config.policy.strict_days = parse_flag("ITINERARY_STRICT_DAYS", &strict)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// HTTP client configured from these settings.
    pub fn completion_client(&self) -> Result<OpenAiCompletionClient> {
        OpenAiCompletionClient::new(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_model(self.model.clone())
            .with_timeout(self.timeout)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| GuideError::Config(format!("{key} has an invalid value `{value}`: {err}")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GuideError::Config(format!(
            "{key} must be a boolean flag, got `{value}`"
        ))),
    }
}
