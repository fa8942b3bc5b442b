//! Administrative areas used for spatial enrichment

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Area classification that decides which location field a match fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaType {
    County,
    Municipality,
    Parish,
    Province,
    EconomicZone,
}

/// Named polygon loaded from the `areas` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaFeature {
    pub area_type: AreaType,
    pub feature_id: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl AreaFeature {
    pub fn to_ref(&self) -> AreaRef {
        AreaRef {
            feature_id: self.feature_id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Lightweight reference to an area stored on observations and in the position cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaRef {
    pub feature_id: String,
    pub name: String,
}

impl AreaRef {
    pub fn new(feature_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            feature_id: feature_id.into(),
            name: name.into(),
        }
    }
}

/// Region assignment for one rounded coordinate
///
/// Built completely before it is inserted into the cache and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAreaCacheEntry {
    pub county: Option<AreaRef>,
    pub municipality: Option<AreaRef>,
    pub parish: Option<AreaRef>,
    pub province: Option<AreaRef>,
    pub is_in_economic_zone: bool,
}
