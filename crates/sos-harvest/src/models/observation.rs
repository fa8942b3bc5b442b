//! Canonical observation model
//!
//! Only the fields the harvest pipeline maps or derives are modelled; the
//! sub-structures follow Darwin Core grouping (event, location, occurrence, ...).

use chrono::{DateTime, Utc};
use geo::Polygon;
use serde::{Deserialize, Serialize};

use super::area::AreaRef;
use super::vocabulary::VocabularyValue;

/// Normalized cross-provider observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalObservation {
    /// Internal id assigned by the persistence layer
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub data_provider_id: i32,
    pub dataset_id: String,
    pub dataset_name: Option<String>,
    pub basis_of_record: Option<VocabularyValue>,
    pub access_rights: Option<VocabularyValue>,
    pub rights_holder: Option<String>,
    pub institution_code: Option<String>,
    pub collection_code: Option<String>,
    pub language: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub event: Event,
    pub location: Location,
    pub identification: Identification,
    pub occurrence: Occurrence,
    pub organism: Organism,
    pub geological_context: Option<GeologicalContext>,
    /// `None` means the taxon could not be resolved
    pub taxon: Option<ObservationTaxon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: Option<String>,
    pub parent_event_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub verbatim_event_date: Option<String>,
    pub habitat: Option<String>,
    pub sampling_protocol: Option<String>,
    pub sampling_effort: Option<String>,
    pub event_remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_id: Option<String>,
    pub locality: Option<String>,
    /// WGS84 longitude
    pub decimal_longitude: Option<f64>,
    /// WGS84 latitude
    pub decimal_latitude: Option<f64>,
    pub coordinate_uncertainty_in_meters: Option<i32>,
    pub geodetic_datum: Option<String>,
    pub verbatim_longitude: Option<String>,
    pub verbatim_latitude: Option<String>,
    pub verbatim_srs: Option<String>,
    /// Point buffered by the coordinate uncertainty, for radius queries
    pub point_with_buffer: Option<Polygon<f64>>,
    pub continent: Option<VocabularyValue>,
    pub country: Option<VocabularyValue>,
    pub country_code: Option<String>,
    pub county: Option<AreaRef>,
    pub municipality: Option<AreaRef>,
    pub parish: Option<AreaRef>,
    pub province: Option<AreaRef>,
    /// County with Kalmar split into Öland and mainland
    pub county_part: Option<AreaRef>,
    /// Province with the lappmarker merged into Lappland
    pub province_part: Option<AreaRef>,
    pub is_in_economic_zone: bool,
    pub minimum_elevation_in_meters: Option<f64>,
    pub maximum_elevation_in_meters: Option<f64>,
    pub minimum_depth_in_meters: Option<f64>,
    pub maximum_depth_in_meters: Option<f64>,
}

impl Location {
    /// Canonical coordinate, when both axes are present
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        match (self.decimal_longitude, self.decimal_latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identification {
    pub identified_by: Option<String>,
    pub date_identified: Option<String>,
    pub identification_remarks: Option<String>,
    pub verified: bool,
    pub uncertain_identification: bool,
    /// Taxon id text exactly as the provider sent it
    pub verbatim_taxon_id: Option<String>,
    /// Scientific name exactly as the provider sent it
    pub verbatim_scientific_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub occurrence_id: Option<String>,
    pub catalog_number: Option<String>,
    pub record_number: Option<String>,
    pub recorded_by: Option<String>,
    pub individual_count: Option<String>,
    pub organism_quantity: Option<String>,
    pub organism_quantity_int: Option<i32>,
    pub organism_quantity_unit: Option<VocabularyValue>,
    pub sex: Option<VocabularyValue>,
    pub life_stage: Option<VocabularyValue>,
    pub reproductive_condition: Option<VocabularyValue>,
    pub behavior: Option<VocabularyValue>,
    pub establishment_means: Option<VocabularyValue>,
    pub occurrence_status: Option<VocabularyValue>,
    pub occurrence_remarks: Option<String>,
    pub url: Option<String>,
    pub is_positive_observation: bool,
    pub is_never_found_observation: bool,
    pub is_natural_occurrence: bool,
    pub is_not_rediscovered_observation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organism {
    pub organism_id: Option<String>,
    pub organism_name: Option<String>,
    pub organism_scope: Option<String>,
    pub organism_remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeologicalContext {
    pub earliest_eon_or_lowest_eonothem: Option<String>,
    pub earliest_era_or_lowest_erathem: Option<String>,
    pub earliest_period_or_lowest_system: Option<String>,
    pub earliest_epoch_or_lowest_series: Option<String>,
    pub latest_era_or_highest_erathem: Option<String>,
    pub lithostratigraphic_terms: Option<String>,
    pub formation: Option<String>,
    pub bed: Option<String>,
}

impl GeologicalContext {
    pub fn is_empty(&self) -> bool {
        self == &GeologicalContext::default()
    }
}

/// Resolved taxon snapshot embedded in the observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationTaxon {
    pub id: i32,
    pub scientific_name: String,
    pub vernacular_name: Option<String>,
    pub taxon_rank: Option<String>,
}
