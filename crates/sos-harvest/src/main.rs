//! SOS Harvest - command line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sos_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sos_harvest::config::{find_provider, load_providers};
use sos_harvest::harvest::{HarvestOrchestrator, HttpFileFetcher, PackageOpener};
use sos_harvest::models::{summarize_runs, AreaFeature, HarvestRun, Taxon, Vocabulary};
use sos_harvest::{
    reference, AreaEnricher, BatchWriter, DocumentStore, HarvestConfig, PgDocumentStore,
    TransformContext,
};

#[derive(Parser, Debug)]
#[command(name = "sos-harvest")]
#[command(author, version, about = "Species observation harvest tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest one data provider
    Harvest {
        /// Provider identifier from the provider registry
        #[arg(short, long)]
        provider: String,
    },

    /// Harvest every provider in the registry
    HarvestAll,

    /// Load reference data files into the store
    ImportReference {
        /// JSON array of vocabularies
        #[arg(long)]
        vocabularies: Option<PathBuf>,

        /// JSON array of taxa
        #[arg(long)]
        taxa: Option<PathBuf>,

        /// JSON array of area features
        #[arg(long)]
        areas: Option<PathBuf>,
    },

    /// Resolve the coordinates of already harvested observations and write the position cache file
    PersistCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sos-harvest")
        .filter_directives("sqlx=warn,hyper=info,reqwest=info")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = HarvestConfig::from_env().context("Failed to load harvest configuration")?;
    let store = Arc::new(
        PgDocumentStore::connect(config.require_database_url()?, config.database_max_connections)
            .await
            .context("Failed to connect to the document store")?,
    );
    info!("Document store connected");

    match cli.command {
        Command::Harvest { provider } => {
            let providers = load_providers(&config.providers_file)?;
            let provider = find_provider(&providers, &provider)?.clone();
            let runs = harvest(&config, store, std::slice::from_ref(&provider)).await?;
            report(&runs)
        }
        Command::HarvestAll => {
            let providers = load_providers(&config.providers_file)?;
            let runs = harvest(&config, store, &providers).await?;
            report(&runs)
        }
        Command::ImportReference {
            vocabularies,
            taxa,
            areas,
        } => import_reference(&config, store, vocabularies, taxa, areas).await,
        Command::PersistCache => persist_cache(&config, store).await,
    }
}

async fn persist_cache(config: &HarvestConfig, store: Arc<PgDocumentStore>) -> Result<()> {
    let enricher = AreaEnricher::initialize(
        store.as_ref(),
        config.area_cache_file.clone(),
        config.area_page_size,
    )
    .await
    .context("Failed to build the area index")?;

    let providers = load_providers(&config.providers_file)?;
    for provider in &providers {
        let collection = provider.permanent_collection();
        if !store.collection_exists(&collection).await? {
            continue;
        }
        enricher
            .warm_from_collection(store.as_ref(), &collection, config.area_page_size)
            .await
            .with_context(|| format!("Failed to read {}", collection))?;
    }

    let entries = enricher.persist_cache()?;
    info!(entries, "Position cache persisted");
    Ok(())
}

async fn harvest(
    config: &HarvestConfig,
    store: Arc<PgDocumentStore>,
    providers: &[sos_harvest::models::DataProviderDescriptor],
) -> Result<Vec<HarvestRun>> {
    let context = TransformContext::load(store.as_ref(), config.area_page_size)
        .await
        .context("Failed to load vocabularies and taxa")?;
    let enricher = Arc::new(
        AreaEnricher::initialize(
            store.as_ref(),
            config.area_cache_file.clone(),
            config.area_page_size,
        )
        .await
        .context("Failed to build the area index")?,
    );
    let fetcher = Arc::new(HttpFileFetcher::new(config.fetcher_config())?);

    let orchestrator = HarvestOrchestrator::new(
        store,
        fetcher,
        Arc::new(PackageOpener),
        context,
        Arc::clone(&enricher),
        config.writer_config(),
        config.harvest_settings(),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, canceling harvest");
            on_signal.cancel();
        }
    });

    let runs = orchestrator.harvest_all(providers, &cancel).await;

    match enricher.persist_cache() {
        Ok(entries) => info!(entries, "Position cache persisted"),
        Err(e) => error!(error = %e, "Failed to persist position cache"),
    }

    Ok(runs)
}

fn report(runs: &[HarvestRun]) -> Result<()> {
    for row in runs.iter().flat_map(HarvestRun::report) {
        info!(
            provider = %row.provider_id,
            dataset = %row.dataset_id,
            status = %row.status,
            count = row.count,
            "Dataset result"
        );
    }
    println!("{}", summarize_runs(runs));

    if runs.iter().any(|r| r.status.is_error()) {
        anyhow::bail!("One or more providers failed");
    }
    Ok(())
}

async fn import_reference(
    config: &HarvestConfig,
    store: Arc<PgDocumentStore>,
    vocabularies: Option<PathBuf>,
    taxa: Option<PathBuf>,
    areas: Option<PathBuf>,
) -> Result<()> {
    let store: Arc<dyn DocumentStore> = store;
    let writer = BatchWriter::new(store, config.writer_config());

    if let Some(path) = vocabularies {
        let items: Vec<Vocabulary> = reference::read_json_array(&path)?;
        reference::import_vocabularies(&writer, &items)
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?;
    }
    if let Some(path) = taxa {
        let items: Vec<Taxon> = reference::read_json_array(&path)?;
        reference::import_taxa(&writer, &items)
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?;
    }
    if let Some(path) = areas {
        let items: Vec<AreaFeature> = reference::read_json_array(&path)?;
        reference::import_areas(&writer, &items)
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?;
    }

    info!("Reference data import complete");
    Ok(())
}
