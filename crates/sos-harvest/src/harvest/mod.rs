//! Harvest orchestration and its collaborators
//!
//! - [`fetch`]: HTTP download and metadata fetch with retry
//! - [`archive`]: opening downloaded packages into record batches
//! - [`metadata`]: publication date extraction from EML
//! - [`landing`]: temporary landing collection and the final swap
//! - [`search`]: optional search index refresh
//! - [`orchestrator`]: the per-provider run

pub mod archive;
pub mod fetch;
pub mod landing;
pub mod metadata;
pub mod orchestrator;
pub mod search;

pub use archive::{ArchiveOpener, ArchiveReader, PackageOpener, RecordBatches};
pub use fetch::{FileFetcher, HttpFetcherConfig, HttpFileFetcher};
pub use landing::LandingArea;
pub use orchestrator::{HarvestOrchestrator, HarvestSettings};
pub use search::SearchIndex;
