pub mod config;
pub mod pipeline;

pub use config::{GenerationSettings, GuideConfig};
pub use pipeline::ItineraryPipeline;
