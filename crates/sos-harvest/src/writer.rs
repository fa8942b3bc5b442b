//! Resilient batch writer
//!
//! Input is partitioned into fixed-size jobs that a bounded pool drains.
//! A rate-limited job larger than [`SPLIT_FLOOR`] is split in half and both
//! halves go back on the queue, where they run concurrently. Any other store
//! error retries the same job up to [`MAX_RETRIES`] times with a linearly
//! growing delay. Jobs that already committed stay committed when a later
//! job fails.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::store::{lookup, DocumentStore, Filter, StoreError, StoreResult, ID_FIELD};

/// Rate-limited jobs at or below this size fail instead of splitting
pub const SPLIT_FLOOR: usize = 5;

/// Retries after the first attempt for non rate-limit failures
pub const MAX_RETRIES: u32 = 3;

pub const DEFAULT_WRITE_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_PARALLEL_BATCHES: usize = 4;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub batch_size: usize,
    pub max_parallel_batches: usize,
    /// Base delay; attempt `n` waits `n * retry_delay`
    pub retry_delay: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_WRITE_BATCH_SIZE,
            max_parallel_batches: DEFAULT_MAX_PARALLEL_BATCHES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Terminal failure of a write call
///
/// `committed` is the number of documents written by jobs that finished
/// before or alongside the failing one.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Batch of {size} documents still rate limited at the split floor ({committed} committed)")]
    RateLimited {
        size: usize,
        committed: usize,
        #[source]
        source: StoreError,
    },

    #[error("Batch of {size} documents failed after {attempts} attempts ({committed} committed)")]
    RetriesExhausted {
        size: usize,
        attempts: u32,
        committed: usize,
        #[source]
        source: StoreError,
    },

    #[error("Failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WriteError {
    pub fn committed(&self) -> usize {
        match self {
            WriteError::RateLimited { committed, .. } => *committed,
            WriteError::RetriesExhausted { committed, .. } => *committed,
            WriteError::Serialization(_) => 0,
        }
    }

    fn with_committed(mut self, total: usize) -> Self {
        match &mut self {
            WriteError::RateLimited { committed, .. }
            | WriteError::RetriesExhausted { committed, .. } => *committed = total,
            WriteError::Serialization(_) => {}
        }
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteMode<'a> {
    Insert,
    Upsert { match_field: &'a str },
}

/// Unit of work on the queue; `depth` counts how often it was split
#[derive(Debug)]
struct BatchJob {
    items: Vec<Value>,
    depth: u32,
}

impl BatchJob {
    /// Whether a rate-limited job may be split again
    fn can_split(&self) -> bool {
        self.items.len() > SPLIT_FLOOR
    }

    fn split(mut self) -> (BatchJob, BatchJob) {
        let right = self.items.split_off(self.items.len() / 2);
        let depth = self.depth + 1;
        (
            BatchJob {
                items: self.items,
                depth,
            },
            BatchJob { items: right, depth },
        )
    }
}

enum JobOutcome {
    Committed(usize),
    Split(BatchJob, BatchJob),
    Failed(WriteError),
}

#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn DocumentStore>,
    config: WriterConfig,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn DocumentStore>, config: WriterConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Insert all records; returns the number committed
    pub async fn write_many<T: Serialize>(
        &self,
        collection: &str,
        records: &[T],
    ) -> Result<usize, WriteError> {
        let docs = to_documents(records)?;
        self.run(collection, docs, WriteMode::Insert).await
    }

    /// Insert or replace records, matching existing documents on `match_field`
    pub async fn upsert_many<T: Serialize>(
        &self,
        collection: &str,
        records: &[T],
        match_field: &str,
    ) -> Result<usize, WriteError> {
        let docs = to_documents(records)?;
        self.run(collection, docs, WriteMode::Upsert { match_field })
            .await
    }

    async fn run(
        &self,
        collection: &str,
        docs: Vec<Value>,
        mode: WriteMode<'_>,
    ) -> Result<usize, WriteError> {
        if docs.is_empty() {
            return Ok(0);
        }

        let total = docs.len();
        let batch_size = self.config.batch_size.max(1);
        let max_parallel = self.config.max_parallel_batches.max(1);

        let mut queue: VecDeque<BatchJob> = VecDeque::new();
        let mut docs = docs.into_iter().peekable();
        while docs.peek().is_some() {
            queue.push_back(BatchJob {
                items: docs.by_ref().take(batch_size).collect(),
                depth: 0,
            });
        }

        let mut in_flight = FuturesUnordered::new();
        let mut committed = 0;
        let mut failure: Option<WriteError> = None;

        loop {
            // No new jobs start once one has failed terminally
            while failure.is_none() && in_flight.len() < max_parallel {
                match queue.pop_front() {
                    Some(job) => in_flight.push(self.execute(collection, job, mode)),
                    None => break,
                }
            }

            match in_flight.next().await {
                Some(JobOutcome::Committed(count)) => committed += count,
                Some(JobOutcome::Split(left, right)) => {
                    queue.push_front(right);
                    queue.push_front(left);
                }
                Some(JobOutcome::Failed(err)) => {
                    failure.get_or_insert(err);
                }
                None => break,
            }
        }

        match failure {
            Some(err) => {
                let err = err.with_committed(committed);
                error!(
                    collection,
                    total,
                    committed,
                    error = %err,
                    "Batch write failed"
                );
                Err(err)
            }
            None => {
                info!(collection, committed, "Batch write complete");
                Ok(committed)
            }
        }
    }

    async fn execute(&self, collection: &str, job: BatchJob, mode: WriteMode<'_>) -> JobOutcome {
        let size = job.items.len();
        let mut attempt: u32 = 0;

        loop {
            let result = match mode {
                WriteMode::Insert => self.store.insert_many(collection, job.items.clone()).await,
                WriteMode::Upsert { match_field } => {
                    self.upsert_batch(collection, job.items.clone(), match_field)
                        .await
                }
            };

            match result {
                Ok(_) => {
                    debug!(collection, size, depth = job.depth, "Batch committed");
                    return JobOutcome::Committed(size);
                }
                Err(e) if e.is_rate_limited() => {
                    if job.can_split() {
                        warn!(
                            collection,
                            size,
                            depth = job.depth,
                            "Store is rate limiting, splitting batch"
                        );
                        let (left, right) = job.split();
                        return JobOutcome::Split(left, right);
                    }
                    error!(collection, size, depth = job.depth, "Rate limited at split floor");
                    return JobOutcome::Failed(WriteError::RateLimited {
                        size,
                        committed: 0,
                        source: e,
                    });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > MAX_RETRIES {
                        error!(collection, size, attempts = attempt, error = %e, "Batch write gave up");
                        return JobOutcome::Failed(WriteError::RetriesExhausted {
                            size,
                            attempts: attempt,
                            committed: 0,
                            source: e,
                        });
                    }
                    let delay = self.config.retry_delay * attempt;
                    warn!(
                        collection,
                        size,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Batch write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Point batch items at the `_id` of existing documents with the same `match_field`
    async fn upsert_batch(
        &self,
        collection: &str,
        mut items: Vec<Value>,
        match_field: &str,
    ) -> StoreResult<usize> {
        let keys: Vec<Value> = items
            .iter()
            .filter_map(|doc| lookup(doc, match_field).cloned())
            .collect();

        if !keys.is_empty() {
            let existing = self
                .store
                .find(collection, &Filter::is_in(match_field, keys))
                .await?;
            let ids: HashMap<String, Value> = existing
                .iter()
                .filter_map(|doc| {
                    let key = lookup(doc, match_field)?.to_string();
                    Some((key, doc.get(ID_FIELD)?.clone()))
                })
                .collect();

            for item in items.iter_mut() {
                let id = lookup(item, match_field).and_then(|key| ids.get(&key.to_string()).cloned());
                if let (Some(id), Some(obj)) = (id, item.as_object_mut()) {
                    obj.insert(ID_FIELD.to_string(), id);
                }
            }
        }

        self.store.bulk_upsert(collection, items, match_field).await
    }
}

fn to_documents<T: Serialize>(records: &[T]) -> Result<Vec<Value>, WriteError> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(WriteError::from))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(n: usize) -> BatchJob {
        BatchJob {
            items: (0..n).map(|i| json!({ "_id": i.to_string() })).collect(),
            depth: 0,
        }
    }

    #[test]
    fn test_split_halves_and_deepens() {
        let (left, right) = job(11).split();
        assert_eq!(left.items.len(), 5);
        assert_eq!(right.items.len(), 6);
        assert_eq!(left.depth, 1);
        assert_eq!(right.depth, 1);
    }

    #[test]
    fn test_split_floor_predicate() {
        assert!(job(6).can_split());
        assert!(!job(5).can_split());
        assert!(!job(1).can_split());
    }

    #[test]
    fn test_committed_is_carried_on_error() {
        let err = WriteError::RateLimited {
            size: 5,
            committed: 0,
            source: StoreError::RateLimited("busy".into()),
        }
        .with_committed(40);
        assert_eq!(err.committed(), 40);
    }
}
