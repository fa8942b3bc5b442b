//! Typed access to the collections the pipeline shares with other services

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{DocumentStore, Filter, StoreError, StoreResult, ID_FIELD};
use crate::models::{DataProviderDescriptor, HarvestRun};

pub const DATA_PROVIDERS: &str = "data_providers";
pub const PROVIDER_METADATA: &str = "provider_metadata";
pub const HARVEST_INFO: &str = "harvest_info";
pub const VOCABULARIES: &str = "vocabularies";
pub const TAXA: &str = "taxa";
pub const AREAS: &str = "areas";

/// Attachment bucket for retained source packages
pub const SOURCE_ARCHIVES: &str = "source_archives";

/// Serialize `value` and set its `_id`
pub fn to_document<T: Serialize>(value: &T, id: impl Into<String>) -> StoreResult<Value> {
    let mut doc = serde_json::to_value(value)?;
    match doc.as_object_mut() {
        Some(obj) => {
            obj.insert(ID_FIELD.to_string(), Value::String(id.into()));
            Ok(doc)
        }
        None => Err(StoreError::InvalidDocument(
            "value does not serialize to a JSON object".to_string(),
        )),
    }
}

/// Read a whole collection page by page
pub async fn load_all<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    page_size: usize,
) -> StoreResult<Vec<T>> {
    let page_size = page_size.max(1);
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = store.find_page(collection, offset, page_size).await?;
        let fetched = page.len();
        for doc in page {
            items.push(serde_json::from_value(doc)?);
        }
        debug!(collection, offset, fetched, "Loaded page");

        if fetched < page_size {
            break;
        }
        offset += fetched;
    }

    Ok(items)
}

/// Provider watermarks, metadata documents and run audit records
#[derive(Clone)]
pub struct ProviderRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProviderRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Last stored state of a provider, if it was ever harvested successfully
    pub async fn get_provider(&self, provider_id: i32) -> StoreResult<Option<DataProviderDescriptor>> {
        let docs = self
            .store
            .find(DATA_PROVIDERS, &Filter::eq(ID_FIELD, provider_id.to_string()))
            .await?;
        docs.into_iter()
            .next()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .transpose()
    }

    /// Copy stored dataset watermarks onto a registry descriptor
    pub async fn apply_watermarks(&self, provider: &mut DataProviderDescriptor) -> StoreResult<()> {
        if let Some(stored) = self.get_provider(provider.id).await? {
            for dataset in provider.datasets.iter_mut() {
                if let Some(previous) = stored.dataset(&dataset.identifier) {
                    dataset.source_date = previous.source_date;
                }
            }
        }
        Ok(())
    }

    pub async fn save_provider(&self, provider: &DataProviderDescriptor) -> StoreResult<()> {
        let doc = to_document(provider, provider.id.to_string())?;
        self.store.bulk_upsert(DATA_PROVIDERS, vec![doc], ID_FIELD).await?;
        Ok(())
    }

    pub async fn save_metadata(
        &self,
        provider: &DataProviderDescriptor,
        dataset_id: &str,
        document: &str,
    ) -> StoreResult<()> {
        let doc = json!({
            ID_FIELD: format!("{}-{}", provider.identifier, dataset_id),
            "providerId": provider.id,
            "datasetId": dataset_id,
            "document": document,
            "storedAt": Utc::now(),
        });
        self.store.bulk_upsert(PROVIDER_METADATA, vec![doc], ID_FIELD).await?;
        Ok(())
    }

    pub async fn save_harvest_run(&self, run: &HarvestRun) -> StoreResult<()> {
        let doc = serde_json::to_value(run)?;
        self.store.bulk_upsert(HARVEST_INFO, vec![doc], ID_FIELD).await?;
        Ok(())
    }
}
