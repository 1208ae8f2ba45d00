use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::PersistenceGateway;
use crate::{
    error::Result,
    types::{ids::ItineraryId, ids::OwnerId, itinerary::Itinerary},
};

/// Process-local gateway. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    itineraries: RwLock<HashMap<ItineraryId, Itinerary>>,
    histories: RwLock<HashMap<OwnerId, Vec<ItineraryId>>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.itineraries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.itineraries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn insert(&self, itinerary: &Itinerary) -> Result<ItineraryId> {
        let id = ItineraryId::generate();
        self.itineraries.write().await.insert(id, itinerary.clone());
        debug!(target: "itinerary::storage", %id, "itinerary stored in memory");
        Ok(id)
    }

    async fn append_to_user_history(&self, owner: &OwnerId, id: &ItineraryId) -> Result<()> {
        self.histories
            .write()
            .await
            .entry(owner.clone())
            .or_default()
            .push(*id);
        Ok(())
    }

    async fn remove(&self, id: &ItineraryId) -> Result<()> {
        self.itineraries.write().await.remove(id);
        Ok(())
    }

    async fn find(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        Ok(self.itineraries.read().await.get(id).cloned())
    }

    async fn history(&self, owner: &OwnerId) -> Result<Vec<ItineraryId>> {
        Ok(self
            .histories
            .read()
            .await
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }
}
