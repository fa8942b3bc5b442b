//! Controlled vocabulary lookup

use std::collections::HashMap;

use crate::models::{Vocabulary, VocabularyField, VocabularyValue};

/// Well-known ids in the shared vocabularies
pub mod ids {
    pub const OCCURRENCE_STATUS_PRESENT: i32 = 0;
    pub const OCCURRENCE_STATUS_ABSENT: i32 = 1;
    pub const CONTINENT_EUROPE: i32 = 4;
    pub const COUNTRY_SWEDEN: i32 = 0;
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Case and whitespace insensitive lookup from provider text to vocabulary id
#[derive(Debug, Clone, Default)]
pub struct VocabularyResolver {
    lookups: HashMap<VocabularyField, HashMap<String, i32>>,
}

impl VocabularyResolver {
    pub fn new(vocabularies: &[Vocabulary]) -> Self {
        let mut lookups: HashMap<VocabularyField, HashMap<String, i32>> = HashMap::new();
        for vocabulary in vocabularies {
            let lookup = lookups.entry(vocabulary.field).or_default();
            for entry in &vocabulary.values {
                lookup.entry(normalize(&entry.value)).or_insert(entry.id);
                for alias in &entry.aliases {
                    lookup.entry(normalize(alias)).or_insert(entry.id);
                }
            }
        }
        Self { lookups }
    }

    fn lookup(&self, field: VocabularyField, raw: &str) -> Option<i32> {
        self.lookups.get(&field)?.get(&normalize(raw)).copied()
    }

    /// Resolve provider text; unknown text comes back with the sentinel id
    ///
    /// Returns `None` only when there is no text to resolve.
    pub fn resolve(&self, field: VocabularyField, raw: Option<&str>) -> Option<VocabularyValue> {
        let raw = raw.filter(|r| !r.trim().is_empty())?;
        Some(match self.lookup(field, raw) {
            Some(id) => VocabularyValue::mapped(id),
            None => VocabularyValue::unmapped(raw),
        })
    }

    /// Resolve provider text, using `default_id` when it is missing or unknown
    pub fn resolve_or_default(
        &self,
        field: VocabularyField,
        raw: Option<&str>,
        default_id: i32,
    ) -> VocabularyValue {
        raw.and_then(|r| self.lookup(field, r))
            .map(VocabularyValue::mapped)
            .unwrap_or_else(|| VocabularyValue::mapped(default_id))
    }
}
