//! SOS Harvest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Harvests species observation datasets from external data providers into
//! the shared observation store.
//!
//! # Overview
//!
//! - **Harvest orchestration**: freshness check, download, parse, transform,
//!   enrich and write into a temporary landing collection that is swapped in
//!   only when the whole provider succeeded
//! - **Transformation**: provider-native verbatim records to the canonical
//!   observation model (vocabularies, taxa, coordinate reprojection)
//! - **Area enrichment**: county, municipality, parish and province lookup
//!   through an R-tree with a shared position cache
//! - **Batch writing**: chunked bulk writes that split under rate limiting
//!   and retry transient failures
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sos_harvest::harvest::{HarvestOrchestrator, HarvestSettings, HttpFileFetcher, PackageOpener};
//! use sos_harvest::{AreaEnricher, InMemoryStore, TransformContext, WriterConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(providers: Vec<sos_harvest::models::DataProviderDescriptor>) -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let context = TransformContext::load(store.as_ref(), 1000).await?;
//! let enricher = AreaEnricher::initialize(store.as_ref(), None, 1000).await?;
//!
//! let orchestrator = HarvestOrchestrator::new(
//!     store,
//!     Arc::new(HttpFileFetcher::new(Default::default())?),
//!     Arc::new(PackageOpener),
//!     context,
//!     Arc::new(enricher),
//!     WriterConfig::default(),
//!     HarvestSettings::default(),
//! );
//! let runs = orchestrator.harvest_all(&providers, &CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod enrich;
pub mod error;
pub mod harvest;
pub mod models;
pub mod reference;
pub mod store;
pub mod transform;
pub mod verbatim;
pub mod writer;

pub use config::HarvestConfig;
pub use enrich::AreaEnricher;
pub use error::{HarvestError, Result};
pub use store::{DocumentStore, InMemoryStore, PgDocumentStore};
pub use transform::TransformContext;
pub use verbatim::VerbatimRecord;
pub use writer::{BatchWriter, WriteError, WriterConfig};
