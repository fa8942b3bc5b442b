//! Search index hook

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::CanonicalObservation;
use crate::store::DocumentStore;

/// Consumer of committed observations
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Enable or disable querying while a bulk load runs
    async fn set_visibility(&self, visible: bool) -> Result<()>;

    async fn index_batch(&self, batch: Vec<CanonicalObservation>) -> Result<()>;
}

/// Page a collection into the index with querying disabled during the load
///
/// Visibility is restored even when the load fails.
pub async fn reindex_collection(
    index: &dyn SearchIndex,
    store: &dyn DocumentStore,
    collection: &str,
    page_size: usize,
) -> Result<usize> {
    index.set_visibility(false).await?;
    let loaded = load_pages(index, store, collection, page_size.max(1)).await;
    let restored = index.set_visibility(true).await;

    let indexed = loaded?;
    restored?;
    info!(collection, indexed, "Indexed observations");
    Ok(indexed)
}

async fn load_pages(
    index: &dyn SearchIndex,
    store: &dyn DocumentStore,
    collection: &str,
    page_size: usize,
) -> Result<usize> {
    let mut offset = 0;
    loop {
        let page = store.find_page(collection, offset, page_size).await?;
        let fetched = page.len();
        let batch = page
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<CanonicalObservation>, _>>()?;
        if !batch.is_empty() {
            index.index_batch(batch).await?;
        }
        offset += fetched;
        if fetched < page_size {
            if offset == 0 {
                warn!(collection, "Nothing to index");
            }
            return Ok(offset);
        }
    }
}
