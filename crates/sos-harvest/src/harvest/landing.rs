//! Temporary landing collection and the swap into the permanent one

use std::sync::Arc;
use tracing::{info, warn};

use crate::models::DataProviderDescriptor;
use crate::store::{DocumentStore, StoreResult};

/// Double buffer for one provider's observations
///
/// Readers only ever see the permanent collection. A harvest fills the
/// temporary collection and [`publish`](Self::publish) replaces the
/// permanent one with it.
pub struct LandingArea {
    store: Arc<dyn DocumentStore>,
    permanent: String,
    temp: String,
}

impl LandingArea {
    pub fn new(store: Arc<dyn DocumentStore>, provider: &DataProviderDescriptor) -> Self {
        Self {
            store,
            permanent: provider.permanent_collection(),
            temp: provider.temp_collection(),
        }
    }

    pub fn temp_collection(&self) -> &str {
        &self.temp
    }

    pub fn permanent_collection(&self) -> &str {
        &self.permanent
    }

    /// Start from an empty temporary collection
    pub async fn prepare(&self) -> StoreResult<()> {
        self.store.drop_collection(&self.temp).await?;
        self.store.create_collection(&self.temp).await?;
        info!(collection = %self.temp, "Prepared landing collection");
        Ok(())
    }

    /// Drop partial data; the permanent collection is left untouched
    pub async fn discard(&self) {
        if let Err(e) = self.store.drop_collection(&self.temp).await {
            warn!(collection = %self.temp, error = %e, "Failed to drop landing collection");
        }
    }

    /// Replace the permanent collection with the temporary one
    pub async fn publish(&self) -> StoreResult<u64> {
        self.store.rename_collection(&self.temp, &self.permanent).await?;
        let count = self.store.count_documents(&self.permanent).await?;
        info!(collection = %self.permanent, count, "Published harvested observations");
        Ok(count)
    }

    pub async fn permanent_count(&self) -> StoreResult<u64> {
        self.store.count_documents(&self.permanent).await
    }
}
