//! Growth-only cache of region assignments per rounded coordinate
//!
//! Keys are `"<lon>-<lat>"` with both values rounded to five decimals and
//! printed without trailing zeros, e.g. `16-58` or `18.06512-59.33258`.
//! Entries are built completely before insertion and never change after.

use sos_common::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::models::PositionAreaCacheEntry;

const PRECISION: f64 = 100_000.0;

/// Round to five decimals (about one metre)
pub fn round_coordinate(value: f64) -> f64 {
    let rounded = (value * PRECISION).round() / PRECISION;
    // Avoid "-0" keys
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn cache_key(lon: f64, lat: f64) -> String {
    format!("{}-{}", round_coordinate(lon), round_coordinate(lat))
}

#[derive(Debug, Default)]
pub struct PositionAreaCache {
    entries: RwLock<HashMap<String, Arc<PositionAreaCacheEntry>>>,
}

impl PositionAreaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: HashMap<String, PositionAreaCacheEntry>) -> Self {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(key, entry)| (key, Arc::new(entry)))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Arc<PositionAreaCacheEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Insert unless another caller got there first; returns the stored entry
    pub fn insert_if_absent(
        &self,
        key: String,
        entry: PositionAreaCacheEntry,
    ) -> Arc<PositionAreaCacheEntry> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Arc::new(entry))
            .clone()
    }

    /// Read a cache file written by [`persist`](Self::persist); a missing file gives an empty cache
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No position cache file, starting cold");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, PositionAreaCacheEntry> = serde_json::from_str(&content)?;
        info!(path = %path.display(), entries = entries.len(), "Loaded position cache");
        Ok(Self::from_entries(entries))
    }

    /// Rewrite the whole cache file; returns the number of entries written
    pub fn persist(&self, path: &Path) -> Result<usize> {
        let (bytes, count) = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let snapshot: BTreeMap<&str, &PositionAreaCacheEntry> = entries
                .iter()
                .map(|(key, entry)| (key.as_str(), entry.as_ref()))
                .collect();
            (serde_json::to_vec(&snapshot)?, snapshot.len())
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;

        info!(path = %path.display(), entries = count, "Persisted position cache");
        Ok(count)
    }
}
