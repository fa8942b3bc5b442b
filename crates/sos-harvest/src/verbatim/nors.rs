//! NORS fish survey observation

use serde::Deserialize;

/// Observation exported by the NORS (national register of survey test-fishing) API
///
/// Coordinates are grid values in the declared `coordinateSystem`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NorsVerbatimObservation {
    #[serde(skip)]
    pub record_id: u64,
    pub observation_id: String,
    pub dyntaxa_taxon_id: Option<i32>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub coordinate_x: Option<f64>,
    #[serde(default)]
    pub coordinate_y: Option<f64>,
    #[serde(default)]
    pub coordinate_system: Option<String>,
    #[serde(default)]
    pub coordinate_uncertainty_in_meters: Option<i32>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<String>,
    #[serde(default)]
    pub individual_count: Option<i32>,
    #[serde(default)]
    pub sampling_protocol: Option<String>,
    #[serde(default)]
    pub institution_code: Option<String>,
    #[serde(default)]
    pub collection_code: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub occurrence_status: Option<String>,
    /// Provider override of the positive/negative classification
    #[serde(default)]
    pub is_positive_observation: Option<bool>,
    #[serde(default)]
    pub is_natural_occurrence: Option<bool>,
    #[serde(default)]
    pub is_not_rediscovered_observation: Option<bool>,
}
