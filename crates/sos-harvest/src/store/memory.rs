//! In-process document store
//!
//! Backs tests and dry runs. Collections are ordered by `_id` so paging
//! matches the Postgres backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{ensure_id, lookup, DocumentStore, Filter, StoreError, StoreResult, ID_FIELD};

type Collection = BTreeMap<String, Value>;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    attachments: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all collections, sorted
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn attachment(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        self.attachments
            .read()
            .await
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> StoreResult<usize> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();

        let mut inserted = 0;
        for mut doc in docs {
            let id = ensure_id(&mut doc)?;
            if let std::collections::btree_map::Entry::Vacant(slot) = target.entry(id) {
                slot.insert(doc);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        docs: Vec<Value>,
        match_field: &str,
    ) -> StoreResult<usize> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();

        let mut written = 0;
        for mut doc in docs {
            let existing_id = lookup(&doc, match_field).and_then(|key| {
                target
                    .iter()
                    .find(|(_, stored)| lookup(stored, match_field) == Some(key))
                    .map(|(id, _)| id.clone())
            });

            let id = match existing_id {
                Some(id) => {
                    if let Some(obj) = doc.as_object_mut() {
                        obj.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                    }
                    id
                }
                None => ensure_id(&mut doc)?,
            };
            target.insert(id, doc);
            written += 1;
        }
        Ok(written)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_page(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_collection(&self, collection: &str) -> StoreResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> StoreResult<bool> {
        Ok(self.collections.read().await.contains_key(collection))
    }

    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, |docs| docs.len() as u64))
    }

    async fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections
            .remove(from)
            .ok_or_else(|| StoreError::CollectionNotFound(from.to_string()))?;
        collections.insert(to.to_string(), docs);
        Ok(())
    }

    async fn put_attachment(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.attachments
            .write()
            .await
            .insert((bucket.to_string(), name.to_string()), bytes);
        Ok(())
    }
}
