//! Harvest configuration
//!
//! Everything is read from `DATABASE_*` and `SOS_*` environment variables
//! (after `.env` is loaded by the binary) with the defaults below.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sos_common::SosError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harvest::fetch::{DEFAULT_FETCH_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::harvest::orchestrator::{DEFAULT_HARVEST_CONCURRENCY, DEFAULT_READ_BATCH_SIZE};
use crate::harvest::{HarvestSettings, HttpFetcherConfig};
use crate::models::DataProviderDescriptor;
use crate::writer::{WriterConfig, DEFAULT_MAX_PARALLEL_BATCHES, DEFAULT_WRITE_BATCH_SIZE};

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_WORK_DIR: &str = "./data/harvest";
pub const DEFAULT_PROVIDERS_FILE: &str = "./providers.json";
pub const DEFAULT_WRITE_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_METADATA_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_AREA_PAGE_SIZE: usize = 1_000;

/// Main harvest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Download and unpack directory
    pub work_dir: PathBuf,
    /// JSON array of provider descriptors
    pub providers_file: PathBuf,
    pub read_batch_size: usize,
    pub write_batch_size: usize,
    pub max_records: Option<usize>,
    pub max_parallel_writes: usize,
    pub write_retry_delay_ms: u64,
    /// Total attempts for metadata and package requests
    pub metadata_retries: u32,
    pub metadata_retry_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub area_cache_file: Option<PathBuf>,
    pub area_page_size: usize,
    pub persist_harvest_info: bool,
    pub harvest_concurrency: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            providers_file: PathBuf::from(DEFAULT_PROVIDERS_FILE),
            read_batch_size: DEFAULT_READ_BATCH_SIZE,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
            max_records: None,
            max_parallel_writes: DEFAULT_MAX_PARALLEL_BATCHES,
            write_retry_delay_ms: DEFAULT_WRITE_RETRY_DELAY_MS,
            metadata_retries: DEFAULT_FETCH_ATTEMPTS,
            metadata_retry_delay_ms: DEFAULT_METADATA_RETRY_DELAY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            area_cache_file: None,
            area_page_size: DEFAULT_AREA_PAGE_SIZE,
            persist_harvest_info: true,
            harvest_concurrency: DEFAULT_HARVEST_CONCURRENCY,
        }
    }
}

/// Parse an optional variable, failing on malformed values instead of silently defaulting
fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", name, raw, e)),
        _ => Ok(None),
    }
}

impl HarvestConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),
            work_dir: std::env::var("SOS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            providers_file: std::env::var("SOS_PROVIDERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.providers_file),
            read_batch_size: env_parse("SOS_READ_BATCH_SIZE")?.unwrap_or(defaults.read_batch_size),
            write_batch_size: env_parse("SOS_WRITE_BATCH_SIZE")?.unwrap_or(defaults.write_batch_size),
            max_records: env_parse("SOS_MAX_RECORDS")?,
            max_parallel_writes: env_parse("SOS_MAX_PARALLEL_WRITES")?
                .unwrap_or(defaults.max_parallel_writes),
            write_retry_delay_ms: env_parse("SOS_WRITE_RETRY_DELAY_MS")?
                .unwrap_or(defaults.write_retry_delay_ms),
            metadata_retries: env_parse("SOS_METADATA_RETRIES")?.unwrap_or(defaults.metadata_retries),
            metadata_retry_delay_ms: env_parse("SOS_METADATA_RETRY_DELAY_MS")?
                .unwrap_or(defaults.metadata_retry_delay_ms),
            http_timeout_secs: env_parse("SOS_HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout_secs),
            area_cache_file: std::env::var("SOS_AREA_CACHE_FILE").ok().map(PathBuf::from),
            area_page_size: env_parse("SOS_AREA_PAGE_SIZE")?.unwrap_or(defaults.area_page_size),
            persist_harvest_info: env_parse("SOS_PERSIST_HARVEST_INFO")?
                .unwrap_or(defaults.persist_harvest_info),
            harvest_concurrency: env_parse("SOS_HARVEST_CONCURRENCY")?
                .unwrap_or(defaults.harvest_concurrency),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }
        if self.read_batch_size == 0 {
            anyhow::bail!("SOS_READ_BATCH_SIZE must be greater than 0");
        }
        if self.write_batch_size == 0 {
            anyhow::bail!("SOS_WRITE_BATCH_SIZE must be greater than 0");
        }
        if self.max_parallel_writes == 0 {
            anyhow::bail!("SOS_MAX_PARALLEL_WRITES must be greater than 0");
        }
        if self.metadata_retries == 0 {
            anyhow::bail!("SOS_METADATA_RETRIES must be at least 1");
        }
        if self.area_page_size == 0 {
            anyhow::bail!("SOS_AREA_PAGE_SIZE must be greater than 0");
        }
        if self.harvest_concurrency == 0 {
            anyhow::bail!("SOS_HARVEST_CONCURRENCY must be greater than 0");
        }
        if self.max_records == Some(0) {
            anyhow::bail!("SOS_MAX_RECORDS must be greater than 0 when set");
        }
        Ok(())
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            batch_size: self.write_batch_size,
            max_parallel_batches: self.max_parallel_writes,
            retry_delay: Duration::from_millis(self.write_retry_delay_ms),
        }
    }

    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            timeout_secs: self.http_timeout_secs,
            max_attempts: self.metadata_retries,
            retry_delay: Duration::from_millis(self.metadata_retry_delay_ms),
            ..HttpFetcherConfig::default()
        }
    }

    pub fn harvest_settings(&self) -> HarvestSettings {
        HarvestSettings {
            work_dir: self.work_dir.clone(),
            read_batch_size: self.read_batch_size,
            max_records: self.max_records,
            persist_harvest_info: self.persist_harvest_info,
            harvest_concurrency: self.harvest_concurrency,
        }
    }

    /// Require a database URL for commands that touch the store
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must be set");
        }
        Ok(&self.database_url)
    }
}

/// Read the provider registry
pub fn load_providers(path: &Path) -> anyhow::Result<Vec<DataProviderDescriptor>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read provider registry {}", path.display()))?;
    let providers: Vec<DataProviderDescriptor> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse provider registry {}", path.display()))?;
    Ok(providers)
}

/// Find a provider by its identifier, case-insensitively
pub fn find_provider<'a>(
    providers: &'a [DataProviderDescriptor],
    identifier: &str,
) -> Result<&'a DataProviderDescriptor, SosError> {
    providers
        .iter()
        .find(|p| p.identifier.eq_ignore_ascii_case(identifier))
        .ok_or_else(|| SosError::ProviderNotFound(identifier.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DATABASE_URL",
        "SOS_READ_BATCH_SIZE",
        "SOS_WRITE_BATCH_SIZE",
        "SOS_MAX_RECORDS",
        "SOS_WRITE_RETRY_DELAY_MS",
        "SOS_PERSIST_HARVEST_INFO",
        "SOS_HARVEST_CONCURRENCY",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear();
        let config = HarvestConfig::from_env().unwrap();
        assert_eq!(config.read_batch_size, 10_000);
        assert_eq!(config.write_batch_size, 1_000);
        assert_eq!(config.max_records, None);
        assert!(config.persist_harvest_info);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear();
        std::env::set_var("DATABASE_URL", "postgres://localhost/sos");
        std::env::set_var("SOS_WRITE_BATCH_SIZE", "250");
        std::env::set_var("SOS_MAX_RECORDS", "5000");
        std::env::set_var("SOS_WRITE_RETRY_DELAY_MS", "10");
        std::env::set_var("SOS_PERSIST_HARVEST_INFO", "false");

        let config = HarvestConfig::from_env().unwrap();
        clear();

        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/sos");
        assert_eq!(config.writer_config().batch_size, 250);
        assert_eq!(config.writer_config().retry_delay, Duration::from_millis(10));
        assert_eq!(config.harvest_settings().max_records, Some(5000));
        assert!(!config.harvest_settings().persist_harvest_info);
    }

    #[test]
    #[serial]
    fn test_malformed_and_invalid_values_are_rejected() {
        clear();
        std::env::set_var("SOS_READ_BATCH_SIZE", "lots");
        assert!(HarvestConfig::from_env().is_err());

        std::env::set_var("SOS_READ_BATCH_SIZE", "0");
        assert!(HarvestConfig::from_env().is_err());
        clear();
    }

    #[test]
    fn test_load_and_find_providers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("providers.json");
        std::fs::write(
            &path,
            r#"[{"id": 1, "identifier": "Artportalen", "datasets": []},
                {"id": 9, "identifier": "nors", "datasets": [
                    {"identifier": "nors-fish", "dataUrl": "https://example.org/nors.json", "format": "nors_json"}
                ]}]"#,
        )
        .unwrap();

        let providers = load_providers(&path).unwrap();
        assert_eq!(providers.len(), 2);

        let nors = find_provider(&providers, "NORS").unwrap();
        assert_eq!(nors.id, 9);
        assert!(!nors.datasets[0].is_externally_maintained());

        assert!(matches!(
            find_provider(&providers, "missing"),
            Err(SosError::ProviderNotFound(_))
        ));
    }
}
