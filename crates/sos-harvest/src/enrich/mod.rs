//! Spatial area enrichment
//!
//! [`AreaEnricher::initialize`] loads every area feature once per process and
//! builds the index. After that the enricher is read-only apart from the
//! shared position cache and can be used from concurrent harvests.

pub mod cache;
pub mod index;
pub mod regions;

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{AreaFeature, CanonicalObservation, PositionAreaCacheEntry};
use crate::store::repositories::AREAS;
use crate::store::DocumentStore;

pub use cache::{cache_key, round_coordinate, PositionAreaCache};
pub use index::{AreaIndex, AreaIndexBuilder};

pub struct AreaEnricher {
    index: AreaIndex,
    cache: PositionAreaCache,
    cache_file: Option<PathBuf>,
}

impl AreaEnricher {
    pub fn new(index: AreaIndex, cache: PositionAreaCache, cache_file: Option<PathBuf>) -> Self {
        Self {
            index,
            cache,
            cache_file,
        }
    }

    /// Load the `areas` collection page by page, build the index and warm the cache
    pub async fn initialize(
        store: &dyn DocumentStore,
        cache_file: Option<PathBuf>,
        page_size: usize,
    ) -> Result<Self> {
        let page_size = page_size.max(1);
        let mut builder = AreaIndexBuilder::new();
        let mut offset = 0;

        loop {
            let page = store.find_page(AREAS, offset, page_size).await?;
            let fetched = page.len();
            for doc in page {
                let feature: AreaFeature = serde_json::from_value(doc)?;
                builder.add(feature);
            }
            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        if builder.is_empty() {
            warn!("No areas loaded, observations will not get region attributes");
        }
        let index = builder.build();

        let cache = match &cache_file {
            Some(path) => PositionAreaCache::load(path)?,
            None => PositionAreaCache::new(),
        };

        info!(
            areas = index.len(),
            cached_positions = cache.len(),
            "Area enricher initialized"
        );
        Ok(Self::new(index, cache, cache_file))
    }

    pub fn cache(&self) -> &PositionAreaCache {
        &self.cache
    }

    /// Region assignment for a coordinate, computed once per rounded position
    pub fn areas_for(&self, lon: f64, lat: f64) -> Arc<PositionAreaCacheEntry> {
        let key = cache_key(lon, lat);
        if let Some(entry) = self.cache.get(&key) {
            return entry;
        }

        // Look up the rounded position so cold and warm results agree
        let entry = self
            .index
            .lookup(round_coordinate(lon), round_coordinate(lat));
        self.cache.insert_if_absent(key, entry)
    }

    /// Set region attributes on the observation's location
    ///
    /// Observations without a coordinate, or at the origin, are left untouched.
    pub fn enrich(&self, observation: &mut CanonicalObservation) {
        let Some((lon, lat)) = observation.location.coordinate() else {
            return;
        };
        if lon == 0.0 && lat == 0.0 {
            return;
        }

        let entry = self.areas_for(lon, lat);
        let location = &mut observation.location;
        location.county = entry.county.clone();
        location.municipality = entry.municipality.clone();
        location.parish = entry.parish.clone();
        location.province = entry.province.clone();
        location.is_in_economic_zone = entry.is_in_economic_zone;
        location.county_part = regions::county_part(entry.county.as_ref(), entry.province.as_ref());
        location.province_part = regions::province_part(entry.province.as_ref());
    }

    pub fn enrich_all(&self, observations: &mut [CanonicalObservation]) {
        for observation in observations.iter_mut() {
            self.enrich(observation);
        }
    }

    /// Resolve the coordinate of every observation stored in `collection`
    ///
    /// Returns the number of positions added to the cache.
    pub async fn warm_from_collection(
        &self,
        store: &dyn DocumentStore,
        collection: &str,
        page_size: usize,
    ) -> Result<usize> {
        let page_size = page_size.max(1);
        let before = self.cache.len();
        let mut offset = 0;

        loop {
            let page = store.find_page(collection, offset, page_size).await?;
            let fetched = page.len();
            for (lon, lat) in page.iter().filter_map(stored_coordinate) {
                if lon != 0.0 || lat != 0.0 {
                    self.areas_for(lon, lat);
                }
            }
            if fetched < page_size {
                break;
            }
            offset += fetched;
        }

        let added = self.cache.len().saturating_sub(before);
        info!(collection, added, "Warmed position cache from stored observations");
        Ok(added)
    }

    /// Write the cache to the configured side file
    pub fn persist_cache(&self) -> Result<usize> {
        match &self.cache_file {
            Some(path) => self.persist_cache_to(path),
            None => {
                warn!("No position cache file configured, skipping persist");
                Ok(0)
            }
        }
    }

    pub fn persist_cache_to(&self, path: &Path) -> Result<usize> {
        Ok(self.cache.persist(path)?)
    }
}

fn stored_coordinate(doc: &Value) -> Option<(f64, f64)> {
    let lon = doc.pointer("/location/decimalLongitude")?.as_f64()?;
    let lat = doc.pointer("/location/decimalLatitude")?.as_f64()?;
    Some((lon, lat))
}
