//! Bounding-box index over area polygons
//!
//! Features are collected by [`AreaIndexBuilder`] and bulk loaded once into
//! an R-tree. The finished [`AreaIndex`] is read-only; loading new areas
//! means building a new index.

use geo::{Area, BoundingRect, Intersects, Point};
use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::models::{AreaFeature, AreaType, PositionAreaCacheEntry};

#[derive(Debug)]
struct IndexedArea {
    envelope: AABB<[f64; 2]>,
    /// Planar area in square degrees, only used to rank overlapping matches
    size: f64,
    feature: AreaFeature,
}

impl IndexedArea {
    /// Smaller polygons win, then the lower feature id
    fn ranks_before(&self, other: &IndexedArea) -> bool {
        self.size
            .total_cmp(&other.size)
            .then_with(|| self.feature.feature_id.cmp(&other.feature.feature_id))
            .is_lt()
    }
}

impl RTreeObject for IndexedArea {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedArea {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope.distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.envelope.contains_point(point)
    }
}

#[derive(Debug, Default)]
pub struct AreaIndexBuilder {
    areas: Vec<IndexedArea>,
}

impl AreaIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, feature: AreaFeature) {
        let Some(rect) = feature.geometry.bounding_rect() else {
            warn!(feature_id = %feature.feature_id, "Skipping area without geometry");
            return;
        };
        let (min, max) = (rect.min(), rect.max());
        self.areas.push(IndexedArea {
            envelope: AABB::from_corners([min.x, min.y], [max.x, max.y]),
            size: feature.geometry.unsigned_area(),
            feature,
        });
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn build(self) -> AreaIndex {
        let count = self.areas.len();
        let tree = RTree::bulk_load(self.areas);
        info!(areas = count, "Built area index");
        AreaIndex { tree }
    }
}

#[derive(Debug)]
pub struct AreaIndex {
    tree: RTree<IndexedArea>,
}

impl AreaIndex {
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Classify the areas whose polygon covers the point
    ///
    /// Bounding-box candidates are checked against the exact geometry. When
    /// several polygons of one type match, the smallest wins.
    pub fn lookup(&self, lon: f64, lat: f64) -> PositionAreaCacheEntry {
        let point = Point::new(lon, lat);
        let mut best: HashMap<AreaType, &IndexedArea> = HashMap::new();

        for candidate in self.tree.locate_all_at_point(&[lon, lat]) {
            if !candidate.feature.geometry.intersects(&point) {
                continue;
            }
            best.entry(candidate.feature.area_type)
                .and_modify(|current| {
                    if candidate.ranks_before(current) {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }

        let area_ref = |area_type| best.get(&area_type).map(|a| a.feature.to_ref());
        PositionAreaCacheEntry {
            county: area_ref(AreaType::County),
            municipality: area_ref(AreaType::Municipality),
            parish: area_ref(AreaType::Parish),
            province: area_ref(AreaType::Province),
            is_in_economic_zone: best.contains_key(&AreaType::EconomicZone),
        }
    }
}
