//! Document store contract and backends
//!
//! Documents are JSON objects keyed by `_id`. Collections are created on
//! first write. Bulk writes are unordered: a duplicate key skips that
//! document instead of aborting the batch.

pub mod memory;
pub mod postgres;
pub mod repositories;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;

/// Primary key field of every document
pub const ID_FIELD: &str = "_id";

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by a [`DocumentStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transient back-pressure; callers may retry with smaller requests
    #[error("Store is rate limiting requests: {0}")]
    RateLimited(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, StoreError::RateLimited(_))
    }
}

/// Selection of documents by field value
///
/// Field names are dotted paths into the document, e.g. `occurrence.occurrenceId`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In {
            field: field.into(),
            values,
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => lookup(doc, field) == Some(value),
            Filter::In { field, values } => {
                lookup(doc, field).map_or(false, |found| values.contains(found))
            }
        }
    }
}

/// Resolve a dotted path inside a JSON document
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// `_id` of a document as text
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Give a document a fresh `_id` unless it already has one
pub fn ensure_id(doc: &mut Value) -> StoreResult<String> {
    if let Some(id) = document_id(doc) {
        return Ok(id);
    }
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidDocument("document is not a JSON object".to_string()))?;
    let id = uuid::Uuid::new_v4().to_string();
    obj.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    Ok(id)
}

/// Durable document store used for observations, reference data and run metadata
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert documents, skipping ones whose `_id` already exists
    ///
    /// Returns the number of documents actually inserted.
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> StoreResult<usize>;

    /// Replace documents that share `match_field` with an existing document, insert the rest
    async fn bulk_upsert(
        &self,
        collection: &str,
        docs: Vec<Value>,
        match_field: &str,
    ) -> StoreResult<usize>;

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Page through a collection in `_id` order
    async fn find_page(&self, collection: &str, offset: usize, limit: usize)
        -> StoreResult<Vec<Value>>;

    async fn create_collection(&self, collection: &str) -> StoreResult<()>;

    /// Drop a collection; dropping a missing collection is not an error
    async fn drop_collection(&self, collection: &str) -> StoreResult<()>;

    async fn collection_exists(&self, collection: &str) -> StoreResult<bool>;

    /// Document count; zero for a missing collection
    async fn count_documents(&self, collection: &str) -> StoreResult<u64>;

    /// Rename `from` to `to`, replacing any existing `to`
    async fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Store a binary attachment, replacing one with the same name
    async fn put_attachment(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> StoreResult<()>;
}
