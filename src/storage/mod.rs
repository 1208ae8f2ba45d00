//! Durable storage for accepted itineraries.
//!
//! The pipeline only ever writes through [`PersistenceGateway`] after a plan
//! has been validated. Stored itineraries are immutable; a user's history is
//! append-only.

pub mod json_dir;
pub mod memory;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{ids::ItineraryId, ids::OwnerId, itinerary::Itinerary},
};

pub use json_dir::JsonDirGateway;
pub use memory::InMemoryGateway;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Store one itinerary document and return its new identifier.
    async fn insert(&self, itinerary: &Itinerary) -> Result<ItineraryId>;

    /// Link a stored itinerary to the user who requested it.
    async fn append_to_user_history(&self, owner: &OwnerId, id: &ItineraryId) -> Result<()>;

    /// Delete a stored itinerary. Removing an unknown id is not an error.
    ///
    /// Used to undo an `insert` whose history append failed.
    async fn remove(&self, id: &ItineraryId) -> Result<()>;

    async fn find(&self, id: &ItineraryId) -> Result<Option<Itinerary>>;

    /// Itinerary ids of one user, oldest first.
    async fn history(&self, owner: &OwnerId) -> Result<Vec<ItineraryId>>;
}
