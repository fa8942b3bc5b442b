//! Darwin Core occurrence row

use serde::Deserialize;

/// Occurrence row read from a Darwin Core archive
///
/// Field names follow the Darwin Core term names used as column headers.
/// Every field is optional text; typing happens in the transformer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DwcVerbatimObservation {
    #[serde(skip)]
    pub record_id: u64,

    // Record level
    pub basis_of_record: Option<String>,
    pub access_rights: Option<String>,
    pub rights_holder: Option<String>,
    pub institution_code: Option<String>,
    pub collection_code: Option<String>,
    #[serde(rename = "datasetID")]
    pub dataset_id: Option<String>,
    pub dataset_name: Option<String>,
    pub language: Option<String>,
    pub modified: Option<String>,

    // Occurrence
    #[serde(rename = "occurrenceID")]
    pub occurrence_id: Option<String>,
    pub catalog_number: Option<String>,
    pub record_number: Option<String>,
    pub recorded_by: Option<String>,
    pub individual_count: Option<String>,
    pub organism_quantity: Option<String>,
    pub organism_quantity_type: Option<String>,
    pub sex: Option<String>,
    pub life_stage: Option<String>,
    pub reproductive_condition: Option<String>,
    pub behavior: Option<String>,
    pub establishment_means: Option<String>,
    pub occurrence_status: Option<String>,
    pub occurrence_remarks: Option<String>,
    pub references: Option<String>,

    // Organism
    #[serde(rename = "organismID")]
    pub organism_id: Option<String>,
    pub organism_name: Option<String>,
    pub organism_scope: Option<String>,
    pub organism_remarks: Option<String>,

    // Event
    #[serde(rename = "eventID")]
    pub event_id: Option<String>,
    #[serde(rename = "parentEventID")]
    pub parent_event_id: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub habitat: Option<String>,
    pub sampling_protocol: Option<String>,
    pub sampling_effort: Option<String>,
    pub event_remarks: Option<String>,

    // Location
    #[serde(rename = "locationID")]
    pub location_id: Option<String>,
    pub continent: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub locality: Option<String>,
    pub decimal_latitude: Option<String>,
    pub decimal_longitude: Option<String>,
    pub geodetic_datum: Option<String>,
    pub coordinate_uncertainty_in_meters: Option<String>,
    pub verbatim_latitude: Option<String>,
    pub verbatim_longitude: Option<String>,
    #[serde(rename = "verbatimSRS")]
    pub verbatim_srs: Option<String>,
    pub minimum_elevation_in_meters: Option<String>,
    pub maximum_elevation_in_meters: Option<String>,
    pub minimum_depth_in_meters: Option<String>,
    pub maximum_depth_in_meters: Option<String>,

    // Identification
    pub identified_by: Option<String>,
    pub date_identified: Option<String>,
    pub identification_remarks: Option<String>,
    pub identification_verification_status: Option<String>,
    pub identification_qualifier: Option<String>,

    // Taxon
    #[serde(rename = "taxonID")]
    pub taxon_id: Option<String>,
    pub scientific_name: Option<String>,
    pub vernacular_name: Option<String>,

    // Geological context
    pub earliest_eon_or_lowest_eonothem: Option<String>,
    pub earliest_era_or_lowest_erathem: Option<String>,
    pub earliest_period_or_lowest_system: Option<String>,
    pub earliest_epoch_or_lowest_series: Option<String>,
    pub latest_era_or_highest_erathem: Option<String>,
    pub lithostratigraphic_terms: Option<String>,
    pub formation: Option<String>,
    pub bed: Option<String>,
}
