//! Taxon lookup indices

use regex::Regex;
use std::collections::HashMap;

use crate::models::{ObservationTaxon, Taxon};

/// Taxa indexed by id, scientific name and synonym
///
/// Name and synonym lookups only succeed when exactly one taxon carries the
/// name; ambiguous names resolve to no taxon.
#[derive(Debug, Clone)]
pub struct TaxonIndex {
    by_id: HashMap<i32, Taxon>,
    by_name: HashMap<String, Vec<i32>>,
    by_synonym: HashMap<String, Vec<i32>>,
    id_pattern: Regex,
}

impl TaxonIndex {
    pub fn new(taxa: Vec<Taxon>) -> Result<Self, regex::Error> {
        let mut by_name: HashMap<String, Vec<i32>> = HashMap::new();
        let mut by_synonym: HashMap<String, Vec<i32>> = HashMap::new();

        for taxon in &taxa {
            push_unique(&mut by_name, &taxon.scientific_name, taxon.id);
            for synonym in &taxon.synonyms {
                push_unique(&mut by_synonym, synonym, taxon.id);
            }
        }

        Ok(Self {
            by_id: taxa.into_iter().map(|t| (t.id, t)).collect(),
            by_name,
            by_synonym,
            id_pattern: Regex::new(r"\d+")?,
        })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&Taxon> {
        self.by_id.get(&id)
    }

    /// Last run of digits in a free-form id such as `urn:lsid:dyntaxa.se:Taxon:100024`
    pub fn parse_taxon_id(&self, raw: &str) -> Option<i32> {
        self.id_pattern
            .find_iter(raw)
            .last()
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Resolve by id, then unique scientific name, then unique synonym
    pub fn resolve(&self, taxon_id: Option<&str>, scientific_name: Option<&str>) -> Option<&Taxon> {
        if let Some(taxon) = taxon_id
            .and_then(|raw| self.parse_taxon_id(raw))
            .and_then(|id| self.by_id.get(&id))
        {
            return Some(taxon);
        }

        let name = scientific_name.map(|n| n.trim().to_lowercase())?;
        unique(&self.by_name, &name)
            .or_else(|| unique(&self.by_synonym, &name))
            .and_then(|id| self.by_id.get(&id))
    }
}

fn push_unique(index: &mut HashMap<String, Vec<i32>>, name: &str, id: i32) {
    let ids = index.entry(name.trim().to_lowercase()).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn unique(index: &HashMap<String, Vec<i32>>, name: &str) -> Option<i32> {
    match index.get(name).map(Vec::as_slice) {
        Some([id]) => Some(*id),
        _ => None,
    }
}

impl From<&Taxon> for ObservationTaxon {
    fn from(taxon: &Taxon) -> Self {
        Self {
            id: taxon.id,
            scientific_name: taxon.scientific_name.clone(),
            vernacular_name: taxon.vernacular_name.clone(),
            taxon_rank: taxon.taxon_rank.clone(),
        }
    }
}
