//! Controlled vocabulary definitions and resolved values

use serde::{Deserialize, Serialize};

/// Controlled fields that are resolved through a vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VocabularyField {
    BasisOfRecord,
    Continent,
    Country,
    EstablishmentMeans,
    LifeStage,
    OccurrenceStatus,
    Sex,
    Unit,
    ReproductiveCondition,
    Behavior,
    AccessRights,
}

impl VocabularyField {
    pub fn as_str(&self) -> &str {
        match self {
            VocabularyField::BasisOfRecord => "BasisOfRecord",
            VocabularyField::Continent => "Continent",
            VocabularyField::Country => "Country",
            VocabularyField::EstablishmentMeans => "EstablishmentMeans",
            VocabularyField::LifeStage => "LifeStage",
            VocabularyField::OccurrenceStatus => "OccurrenceStatus",
            VocabularyField::Sex => "Sex",
            VocabularyField::Unit => "Unit",
            VocabularyField::ReproductiveCondition => "ReproductiveCondition",
            VocabularyField::Behavior => "Behavior",
            VocabularyField::AccessRights => "AccessRights",
        }
    }
}

/// One allowed value with the spellings providers use for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: i32,
    pub value: String,
    /// Translations and provider spellings that map to the same id
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Shared vocabulary definition as stored in the `vocabularies` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    pub field: VocabularyField,
    pub values: Vec<VocabularyEntry>,
}

/// Resolved controlled value
///
/// `value` is only set together with [`VocabularyValue::NO_MAPPING_FOUND_ID`]
/// and carries the provider text that could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyValue {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl VocabularyValue {
    /// Sentinel id meaning "no mapping found, see `value`"
    pub const NO_MAPPING_FOUND_ID: i32 = -1;

    pub fn mapped(id: i32) -> Self {
        Self { id, value: None }
    }

    pub fn unmapped(raw: impl Into<String>) -> Self {
        Self {
            id: Self::NO_MAPPING_FOUND_ID,
            value: Some(raw.into()),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.id != Self::NO_MAPPING_FOUND_ID
    }
}
