//! Per-provider harvest orchestration
//!
//! A run checks dataset freshness, downloads and parses each package,
//! transforms, enriches and writes the records into the provider's landing
//! collection, and swaps it into place only when every dataset succeeded.
//! Watermarks and metadata are stored after a successful swap.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::archive::{ArchiveOpener, RecordBatches};
use super::fetch::FileFetcher;
use super::landing::LandingArea;
use super::metadata::publication_date;
use super::search::{reindex_collection, SearchIndex};
use crate::enrich::AreaEnricher;
use crate::error::{HarvestError, Result};
use crate::models::{
    CanonicalObservation, DataProviderDescriptor, DatasetDescriptor, HarvestRun, PackageFormat,
    RunStatus, NOT_COUNTED,
};
use crate::store::repositories::{ProviderRepository, SOURCE_ARCHIVES};
use crate::store::DocumentStore;
use crate::transform::TransformContext;
use crate::verbatim::VerbatimRecord;
use crate::writer::{BatchWriter, WriterConfig};

pub const DEFAULT_READ_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_HARVEST_CONCURRENCY: usize = 2;

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// Downloads and unpacked packages live below this directory
    pub work_dir: PathBuf,
    pub read_batch_size: usize,
    /// Stop reading a dataset once this many records were written
    pub max_records: Option<usize>,
    pub persist_harvest_info: bool,
    /// Providers harvested at the same time by [`HarvestOrchestrator::harvest_all`]
    pub harvest_concurrency: usize,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("sos-harvest"),
            read_batch_size: DEFAULT_READ_BATCH_SIZE,
            max_records: None,
            persist_harvest_info: true,
            harvest_concurrency: DEFAULT_HARVEST_CONCURRENCY,
        }
    }
}

/// A dataset that has a package to download
struct DatasetPlan {
    dataset: DatasetDescriptor,
    metadata: Option<String>,
    published: Option<DateTime<Utc>>,
}

impl DatasetPlan {
    fn is_unchanged(&self) -> bool {
        self.published.is_some() && self.published == self.dataset.source_date
    }
}

/// How a dataset stream ended
enum StreamOutcome {
    Completed(usize),
    Canceled,
}

/// Cheap to clone; clones share the store, collaborators and enricher
#[derive(Clone)]
pub struct HarvestOrchestrator {
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn FileFetcher>,
    opener: Arc<dyn ArchiveOpener>,
    context: TransformContext,
    enricher: Arc<AreaEnricher>,
    writer: BatchWriter,
    providers: ProviderRepository,
    search_index: Option<Arc<dyn SearchIndex>>,
    settings: HarvestSettings,
}

impl HarvestOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn FileFetcher>,
        opener: Arc<dyn ArchiveOpener>,
        context: TransformContext,
        enricher: Arc<AreaEnricher>,
        writer_config: WriterConfig,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            writer: BatchWriter::new(Arc::clone(&store), writer_config),
            providers: ProviderRepository::new(Arc::clone(&store)),
            store,
            fetcher,
            opener,
            context,
            enricher,
            search_index: None,
            settings,
        }
    }

    pub fn with_search_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.search_index = Some(index);
        self
    }

    pub fn enricher(&self) -> &AreaEnricher {
        &self.enricher
    }

    /// Harvest several providers, at most `harvest_concurrency` at a time
    ///
    /// Each provider runs on its own task. Runs come back in input order.
    pub async fn harvest_all(
        &self,
        providers: &[DataProviderDescriptor],
        cancel: &CancellationToken,
    ) -> Vec<HarvestRun> {
        info!(providers = providers.len(), "Starting harvest of all providers");
        let permits = Arc::new(Semaphore::new(self.settings.harvest_concurrency.max(1)));

        let handles: Vec<_> = providers
            .iter()
            .map(|provider| {
                let orchestrator = self.clone();
                let provider = provider.clone();
                let cancel = cancel.clone();
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    orchestrator.run_harvest(&provider, &cancel).await
                })
            })
            .collect();

        let mut runs = Vec::with_capacity(handles.len());
        for (provider, handle) in providers.iter().zip(handles) {
            match handle.await {
                Ok(run) => runs.push(run),
                Err(e) => {
                    error!(provider = %provider.identifier, error = %e, "Harvest task aborted");
                    runs.push(HarvestRun::start(provider).finish(RunStatus::Failed));
                }
            }
        }
        runs
    }

    /// Run one provider to a terminal status
    ///
    /// Never fails: errors end the run as `Failed` and are logged.
    pub async fn run_harvest(
        &self,
        provider: &DataProviderDescriptor,
        cancel: &CancellationToken,
    ) -> HarvestRun {
        let mut provider = provider.clone();
        let mut run = HarvestRun::start(&provider);
        info!(provider = %provider.identifier, run_id = %run.id, "Starting harvest");

        let landing = LandingArea::new(Arc::clone(&self.store), &provider);
        let status = match self.harvest_provider(&mut provider, &mut run, &landing, cancel).await {
            Ok(status) => status,
            Err(e) => {
                error!(provider = %provider.identifier, error = %e, "Harvest failed");
                RunStatus::Failed
            }
        };

        if matches!(status, RunStatus::Failed | RunStatus::Canceled) {
            landing.discard().await;
        }
        self.cleanup_work_dir(&provider).await;

        let run = run.finish(status);
        info!(
            provider = %provider.identifier,
            status = %run.status,
            count = run.count,
            "Harvest finished"
        );

        if self.settings.persist_harvest_info {
            if let Err(e) = self.providers.save_harvest_run(&run).await {
                warn!(provider = %provider.identifier, error = %e, "Failed to store harvest info");
            }
        }
        run
    }

    async fn harvest_provider(
        &self,
        provider: &mut DataProviderDescriptor,
        run: &mut HarvestRun,
        landing: &LandingArea,
        cancel: &CancellationToken,
    ) -> Result<RunStatus> {
        self.providers.apply_watermarks(provider).await?;

        let mut plans = Vec::new();
        for dataset in &provider.datasets {
            if dataset.is_externally_maintained() {
                info!(
                    provider = %provider.identifier,
                    dataset = %dataset.identifier,
                    "Dataset is maintained outside the harvest"
                );
                run.push_dataset(&dataset.identifier, RunStatus::Success, NOT_COUNTED);
                continue;
            }
            match self.plan_dataset(dataset).await {
                Ok(plan) => plans.push(plan),
                Err(e) => {
                    run.push_dataset(&dataset.identifier, RunStatus::Failed, 0);
                    return Err(e);
                }
            }
        }

        if plans.is_empty() {
            return Ok(RunStatus::Success);
        }

        if plans.iter().all(DatasetPlan::is_unchanged) {
            let existing = landing.permanent_count().await?;
            if existing > 0 {
                info!(
                    provider = %provider.identifier,
                    existing,
                    "Source unchanged since last harvest, skipping"
                );
                for plan in &plans {
                    run.push_dataset(&plan.dataset.identifier, RunStatus::CanceledNoChange, NOT_COUNTED);
                }
                run.count = existing as i64;
                return Ok(RunStatus::CanceledNoChange);
            }
        }

        landing.prepare().await?;

        for plan in plans.iter_mut() {
            if cancel.is_cancelled() {
                warn!(provider = %provider.identifier, "Harvest canceled before dataset");
                return Ok(RunStatus::Canceled);
            }

            match self.harvest_dataset(provider, plan, landing, cancel).await {
                Ok(StreamOutcome::Completed(count)) => {
                    run.push_dataset(&plan.dataset.identifier, RunStatus::Success, count as i64);
                }
                Ok(StreamOutcome::Canceled) => {
                    run.push_dataset(&plan.dataset.identifier, RunStatus::Canceled, 0);
                    return Ok(RunStatus::Canceled);
                }
                Err(e) => {
                    error!(
                        provider = %provider.identifier,
                        dataset = %plan.dataset.identifier,
                        error = %e,
                        "Dataset harvest failed"
                    );
                    run.push_dataset(&plan.dataset.identifier, RunStatus::Failed, 0);
                    return Err(e);
                }
            }
        }

        landing.publish().await?;

        for plan in &plans {
            if plan.dataset.retain_source {
                if let Err(e) = self.retain_source(provider, &plan.dataset).await {
                    warn!(dataset = %plan.dataset.identifier, error = %e, "Failed to retain source package");
                }
            }
            if let Some(published) = plan.published {
                if let Some(dataset) = provider.dataset_mut(&plan.dataset.identifier) {
                    dataset.source_date = Some(published);
                }
            }
            if let Some(metadata) = &plan.metadata {
                self.providers
                    .save_metadata(provider, &plan.dataset.identifier, metadata)
                    .await?;
            }
        }
        self.providers.save_provider(provider).await?;

        if let Some(index) = &self.search_index {
            if let Err(e) = reindex_collection(
                index.as_ref(),
                self.store.as_ref(),
                landing.permanent_collection(),
                self.writer.config().batch_size,
            )
            .await
            {
                warn!(provider = %provider.identifier, error = %e, "Search index update failed");
            }
        }

        Ok(RunStatus::Success)
    }

    /// Fetch the metadata document and publication date, when the dataset has a metadata URL
    async fn plan_dataset(&self, dataset: &DatasetDescriptor) -> Result<DatasetPlan> {
        let Some(url) = dataset.metadata_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(DatasetPlan {
                dataset: dataset.clone(),
                metadata: None,
                published: None,
            });
        };

        let document = self.fetcher.fetch_text(url).await?;
        let published = publication_date(&document)?;
        debug!(
            dataset = %dataset.identifier,
            published = ?published,
            previous = ?dataset.source_date,
            "Checked dataset freshness"
        );

        Ok(DatasetPlan {
            dataset: dataset.clone(),
            metadata: Some(document),
            published,
        })
    }

    fn package_path(&self, provider: &DataProviderDescriptor, dataset: &DatasetDescriptor) -> PathBuf {
        self.settings
            .work_dir
            .join(&provider.identifier)
            .join(format!("{}.{}", dataset.identifier, dataset.format.file_extension()))
    }

    async fn harvest_dataset(
        &self,
        provider: &DataProviderDescriptor,
        plan: &mut DatasetPlan,
        landing: &LandingArea,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome> {
        let dataset = plan.dataset.clone();
        let url = dataset
            .data_url
            .as_deref()
            .ok_or_else(|| HarvestError::Config(format!("{} has no data URL", dataset.identifier)))?;

        let package = self.package_path(provider, &dataset);
        self.fetcher.fetch_to_file(url, &package).await?;

        let unpack_dir = self
            .settings
            .work_dir
            .join(&provider.identifier)
            .join(&dataset.identifier);
        let (metadata, mut batches) = self
            .open_package(package, dataset.format, unpack_dir, plan.metadata.is_none())
            .await?;
        if metadata.is_some() {
            plan.metadata = metadata;
        }

        let context = self.context.for_dataset(provider.id, &dataset.identifier);
        let mut written = 0usize;

        while let Some(batch) = batches.next().await {
            if cancel.is_cancelled() {
                warn!(
                    provider = %provider.identifier,
                    dataset = %dataset.identifier,
                    written,
                    "Harvest canceled"
                );
                return Ok(StreamOutcome::Canceled);
            }

            let mut batch = batch?;
            if let Some(max) = self.settings.max_records {
                batch.truncate(max.saturating_sub(written));
            }
            if batch.is_empty() {
                break;
            }

            let observations = self.transform_and_enrich(&context, batch).await?;
            written += self
                .writer
                .write_many(landing.temp_collection(), &observations)
                .await?;

            debug!(
                provider = %provider.identifier,
                dataset = %dataset.identifier,
                written,
                "Batch processed"
            );

            if let Some(max) = self.settings.max_records.filter(|max| written >= *max) {
                info!(dataset = %dataset.identifier, max, "Record cap reached");
                break;
            }
        }

        info!(
            provider = %provider.identifier,
            dataset = %dataset.identifier,
            records = written,
            "Dataset harvested"
        );
        Ok(StreamOutcome::Completed(written))
    }

    /// Unpack the package and start its record stream on the blocking pool
    async fn open_package(
        &self,
        package: PathBuf,
        format: PackageFormat,
        unpack_dir: PathBuf,
        with_metadata: bool,
    ) -> Result<(Option<String>, RecordBatches)> {
        let opener = Arc::clone(&self.opener);
        let page_size = self.settings.read_batch_size;

        tokio::task::spawn_blocking(move || -> Result<(Option<String>, RecordBatches)> {
            let reader = opener.open(&package, format, &unpack_dir)?;
            let metadata = if with_metadata {
                reader.open_metadata()?
            } else {
                None
            };
            let batches = reader.read_batches(page_size)?;
            Ok((metadata, batches))
        })
        .await?
    }

    async fn transform_and_enrich(
        &self,
        context: &TransformContext,
        batch: Vec<VerbatimRecord>,
    ) -> Result<Vec<CanonicalObservation>> {
        let context = context.clone();
        let enricher = Arc::clone(&self.enricher);

        let observations = tokio::task::spawn_blocking(move || {
            let mut observations: Vec<_> = batch.iter().map(|r| context.transform(r)).collect();
            enricher.enrich_all(&mut observations);
            observations
        })
        .await?;
        Ok(observations)
    }

    async fn retain_source(
        &self,
        provider: &DataProviderDescriptor,
        dataset: &DatasetDescriptor,
    ) -> Result<()> {
        let package = self.package_path(provider, dataset);
        let file_name = package
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}-{}-{}", provider.identifier, dataset.identifier, file_name);

        let (bytes, checksum) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, String)> {
            let bytes = std::fs::read(&package)?;
            let checksum = sos_common::checksum::sha256(&mut bytes.as_slice())?;
            Ok((bytes, checksum))
        })
        .await??;
        let size = bytes.len();

        self.store.put_attachment(SOURCE_ARCHIVES, &name, bytes).await?;
        self.store
            .put_attachment(SOURCE_ARCHIVES, &format!("{}.sha256", name), checksum.clone().into_bytes())
            .await?;

        info!(attachment = %name, bytes = size, sha256 = %checksum, "Retained source package");
        Ok(())
    }

    async fn cleanup_work_dir(&self, provider: &DataProviderDescriptor) {
        let dir: &Path = &self.settings.work_dir.join(&provider.identifier);
        if tokio::fs::try_exists(dir).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                debug!(dir = %dir.display(), error = %e, "Failed to clean work directory");
            }
        }
    }
}
