//! Canonical taxon record

use serde::{Deserialize, Serialize};

/// Taxon as stored in the `taxa` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxon {
    pub id: i32,
    pub scientific_name: String,
    #[serde(default)]
    pub vernacular_name: Option<String>,
    #[serde(default)]
    pub taxon_rank: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}
