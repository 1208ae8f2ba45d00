//! itinerary-rs: budget-constrained travel itineraries from a chat-completion model
//!
//! A [`TripRequest`] is rendered into a prompt, sent once to an OpenAI-compatible
//! endpoint, and the answer is validated with exact decimal arithmetic before it
//! is persisted and linked to its owner. Anything short of a valid, affordable
//! plan comes back as a tagged [`Rejection`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use itinerary_rs::{GuideConfig, InMemoryGateway, ItineraryPipeline, OwnerId, TripRequest};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GuideConfig::from_env()?;
//!     let pipeline = ItineraryPipeline::from_config(&config, Arc::new(InMemoryGateway::new()))?;
//!
//!     let request = TripRequest::builder("Ana", Decimal::new(250000, 2))
//!         .description("Uma semana no litoral nordestino")
//!         .days(7)
//!         .build()?;
//!
//!     match pipeline.generate(&OwnerId::new("ana@example.com"), &request).await {
//!         Ok(stored) => println!("{}", stored.itinerary.render()),
//!         Err(rejection) => println!("{}", rejection.message),
//!     }
//!     Ok(())
//! }
//! ```

extern crate self as itinerary_rs;

pub mod core;
pub mod error;
pub mod schemas;
pub mod services;
pub mod storage;
pub mod types;

pub use core::{GenerationSettings, GuideConfig, ItineraryPipeline};
pub use error::{GuideError, Result};
pub use itinerary_macros::completion_schema;
pub use schemas::{CompletionSchema, SchemaHandle};
pub use services::{
    build_prompt, extract_json_candidate, CompletionClient, GuideValidator,
    OpenAiCompletionClient, ValidationPolicy,
};
pub use storage::{InMemoryGateway, JsonDirGateway, PersistenceGateway};
pub use types::{
    Activity, Cost, DaySequence, Itinerary, ItineraryDay, ItineraryId, OwnerId,
    PersistedItinerary, Rejection, RejectionReason, TravelPreferences, TripRequest,
};

pub use schemas as schema;
pub use types::response;

#[cfg(feature = "cli")]
pub mod cli;
