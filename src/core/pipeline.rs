use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    core::config::{GenerationSettings, GuideConfig},
    error::Result,
    services::{
        completion::{CompletionClient, CompletionRequest},
        extractor::extract_json_candidate,
        guide_validator::{GuideValidator, ValidationPolicy},
        prompt_builder::build_prompt,
    },
    storage::PersistenceGateway,
    types::{
        ids::OwnerId,
        outcome::{PersistedItinerary, Rejection},
        trip::TripRequest,
    },
};

/// Request-scoped orchestration: prompt, one completion, validation, persistence.
///
/// Holds no per-request state, so one pipeline may serve concurrent requests.
#[derive(Clone)]
pub struct ItineraryPipeline {
    client: Arc<dyn CompletionClient>,
    gateway: Arc<dyn PersistenceGateway>,
    validator: GuideValidator,
    settings: GenerationSettings,
}

impl ItineraryPipeline {
    pub fn new(client: Arc<dyn CompletionClient>, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            client,
            gateway,
            validator: GuideValidator::default(),
            settings: GenerationSettings::default(),
        }
    }

    /// Pipeline talking to the HTTP completion endpoint described by `config`.
    pub fn from_config(config: &GuideConfig, gateway: Arc<dyn PersistenceGateway>) -> Result<Self> {
        let client = config.completion_client()?;
        Ok(Self::new(Arc::new(client), gateway)
            .with_policy(config.policy())
            .with_settings(config.settings()))
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validator = GuideValidator::new(policy);
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Produce and persist an itinerary for `owner`, or say why not.
    ///
    /// Exactly one completion call is made. Nothing is written unless the
    /// plan validates, and a history append failure undoes the insert.
    pub async fn generate(
        &self,
        owner: &OwnerId,
        request: &TripRequest,
    ) -> std::result::Result<PersistedItinerary, Rejection> {
        let prompt = build_prompt(request);
        let completion_request = CompletionRequest::new(prompt.messages())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        info!(
            target: "itinerary::pipeline",
            %owner,
            budget = %request.budget(),
            days = ?request.day_count(),
            "requesting itinerary"
        );

        let completion = self
            .client
            .complete(&completion_request)
            .await
            .map_err(|err| {
                error!(
                    target: "itinerary::pipeline",
                    error = %err,
                    code = err.error_code(),
                    retryable = err.is_retryable(),
                    "completion call failed"
                );
                Rejection::upstream()
            })?;

        debug!(
            target: "itinerary::pipeline",
            raw = %completion.content,
            usage = ?completion.usage,
            "completion received"
        );

        let candidate = extract_json_candidate(&completion.content);
        let itinerary = self.validator.validate(candidate, request).map_err(|rejection| {
            info!(
                target: "itinerary::pipeline",
                reason = %rejection.reason,
                "itinerary rejected"
            );
            rejection
        })?;

        let id = self.gateway.insert(&itinerary).await.map_err(|err| {
            error!(target: "itinerary::pipeline", error = %err, "itinerary insert failed");
            Rejection::upstream()
        })?;

        if let Err(err) = self.gateway.append_to_user_history(owner, &id).await {
            warn!(
                target: "itinerary::pipeline",
                %id,
                error = %err,
                "history append failed, removing stored itinerary"
            );
            if let Err(cleanup) = self.gateway.remove(&id).await {
                error!(
                    target: "itinerary::pipeline",
                    %id,
                    error = %cleanup,
                    "orphaned itinerary left in store"
                );
            }
            return Err(Rejection::upstream());
        }

        info!(target: "itinerary::pipeline", %id, %owner, "itinerary stored");
        Ok(PersistedItinerary {
            id,
            owner: owner.clone(),
            itinerary,
        })
    }
}
