//! Test helpers for sos-harvest integration tests
//!
//! This module provides:
//! - Fixtures for reference data, providers and records
//! - A scripted store that wraps [`InMemoryStore`] and injects failures
//! - Fetcher and package opener doubles that never touch the network

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use sos_harvest::error::FetchError;
use sos_harvest::harvest::{ArchiveOpener, ArchiveReader, FileFetcher, RecordBatches};
use sos_harvest::models::PackageFormat;
use sos_harvest::store::{DocumentStore, Filter, InMemoryStore, StoreError, StoreResult};
use sos_harvest::VerbatimRecord;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use fixtures::*;

// ============================================================================
// Scripted store
// ============================================================================

/// Document store that delegates to [`InMemoryStore`] and can be told to fail
///
/// - inserts larger than `rate_limit_above` documents are rejected as rate limited
/// - the next `transient_failures` inserts fail with a database error
/// - accepted inserts can be held for `insert_delay` to make overlap observable
#[derive(Default)]
pub struct ScriptedStore {
    inner: InMemoryStore,
    rate_limit_above: Mutex<Option<usize>>,
    transient_failures: AtomicU32,
    insert_delay: Mutex<Option<Duration>>,
    insert_sizes: Mutex<Vec<usize>>,
    inserts_in_flight: AtomicUsize,
    peak_inserts_in_flight: AtomicUsize,
    renames: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn rate_limit_above(&self, size: usize) {
        *self.rate_limit_above.lock().unwrap() = Some(size);
    }

    pub fn rate_limit_everything(&self) {
        self.rate_limit_above(0);
    }

    pub fn fail_next_inserts(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub fn delay_inserts(&self, delay: Duration) {
        *self.insert_delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of accepted inserts that were running at the same time
    pub fn peak_inserts_in_flight(&self) -> usize {
        self.peak_inserts_in_flight.load(Ordering::SeqCst)
    }

    /// Size of every insert call, including rejected ones
    pub fn insert_sizes(&self) -> Vec<usize> {
        self.insert_sizes.lock().unwrap().clone()
    }

    pub fn rename_count(&self) -> usize {
        self.renames.load(Ordering::SeqCst)
    }

    /// Put documents straight into a collection, bypassing failure injection
    pub async fn seed(&self, collection: &str, docs: Vec<Value>) {
        self.inner.insert_many(collection, docs).await.unwrap();
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> StoreResult<usize> {
        self.insert_sizes.lock().unwrap().push(docs.len());

        let limit = *self.rate_limit_above.lock().unwrap();
        if limit.is_some_and(|limit| docs.len() > limit) {
            return Err(StoreError::RateLimited(format!(
                "request of {} documents exceeds throughput",
                docs.len()
            )));
        }

        let failing = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Database("connection reset by peer".to_string()));
        }

        let running = self.inserts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_inserts_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.insert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.inner.insert_many(collection, docs).await;

        self.inserts_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        docs: Vec<Value>,
        match_field: &str,
    ) -> StoreResult<usize> {
        self.inner.bulk_upsert(collection, docs, match_field).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.inner.find(collection, filter).await
    }

    async fn find_page(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Value>> {
        self.inner.find_page(collection, offset, limit).await
    }

    async fn create_collection(&self, collection: &str) -> StoreResult<()> {
        self.inner.create_collection(collection).await
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.inner.drop_collection(collection).await
    }

    async fn collection_exists(&self, collection: &str) -> StoreResult<bool> {
        self.inner.collection_exists(collection).await
    }

    async fn count_documents(&self, collection: &str) -> StoreResult<u64> {
        self.inner.count_documents(collection).await
    }

    async fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        self.renames.fetch_add(1, Ordering::SeqCst);
        self.inner.rename_collection(from, to).await
    }

    async fn put_attachment(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.inner.put_attachment(bucket, name, bytes).await
    }
}

// ============================================================================
// Fetcher
// ============================================================================

pub const PACKAGE_BYTES: &[u8] = b"nors package bytes";

/// Serves metadata documents from a map and writes a fixed package body
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<String, String>,
    downloads: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: &str, body: impl Into<String>) -> Self {
        self.documents.insert(url.to_string(), body.into());
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileFetcher for StaticFetcher {
    async fn fetch_to_file(&self, _url: &str, path: &Path) -> Result<u64, FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, PACKAGE_BYTES).await?;
        Ok(PACKAGE_BYTES.len() as u64)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::RetriesExhausted {
                url: url.to_string(),
                attempts: 3,
                message: "404 Not Found".to_string(),
            })
    }
}

// ============================================================================
// Package opener
// ============================================================================

/// Opens every package as the same in-memory record list
#[derive(Clone, Default)]
pub struct StaticOpener {
    records: Vec<VerbatimRecord>,
    metadata: Option<String>,
    cancel_on_batch: Option<(usize, CancellationToken)>,
    open_delay: Option<Duration>,
    batches_read: Arc<AtomicUsize>,
}

impl StaticOpener {
    pub fn new(records: Vec<VerbatimRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, document: impl Into<String>) -> Self {
        self.metadata = Some(document.into());
        self
    }

    /// Block the calling thread in `open`, like unpacking a large archive
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Batches handed out so far, shared between clones
    pub fn batches_read(&self) -> usize {
        self.batches_read.load(Ordering::SeqCst)
    }

    /// Cancel `token` just before batch number `batch` (zero based) is handed out
    pub fn cancel_on_batch(mut self, batch: usize, token: CancellationToken) -> Self {
        self.cancel_on_batch = Some((batch, token));
        self
    }
}

impl ArchiveOpener for StaticOpener {
    fn open(
        &self,
        _package: &Path,
        _format: PackageFormat,
        _work_dir: &Path,
    ) -> sos_harvest::Result<Box<dyn ArchiveReader>> {
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }
        Ok(Box::new(self.clone()))
    }
}

impl ArchiveReader for StaticOpener {
    fn open_metadata(&self) -> sos_harvest::Result<Option<String>> {
        Ok(self.metadata.clone())
    }

    fn read_batches(&self, page_size: usize) -> sos_harvest::Result<RecordBatches> {
        let batches: Vec<Vec<VerbatimRecord>> = self
            .records
            .chunks(page_size.max(1))
            .map(<[VerbatimRecord]>::to_vec)
            .collect();
        let cancel = self.cancel_on_batch.clone();
        let batches_read = Arc::clone(&self.batches_read);

        Ok(stream::iter(batches.into_iter().enumerate())
            .map(move |(i, batch)| {
                batches_read.fetch_add(1, Ordering::SeqCst);
                if let Some((at, token)) = &cancel {
                    if i == *at {
                        token.cancel();
                    }
                }
                Ok(batch)
            })
            .boxed())
    }
}
