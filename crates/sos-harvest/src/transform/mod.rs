//! Verbatim to canonical transformation
//!
//! Reference data (vocabularies and taxa) is loaded once per run into a
//! [`TransformContext`] and shared read-only by every record conversion.

pub mod coordinates;
pub mod dwc;
pub mod fields;
pub mod nors;
pub mod taxonomy;
pub mod vocabulary;

use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::models::{CanonicalObservation, Taxon, Vocabulary};
use crate::store::repositories::{load_all, TAXA, VOCABULARIES};
use crate::store::DocumentStore;
use crate::verbatim::VerbatimRecord;

pub use taxonomy::TaxonIndex;
pub use vocabulary::VocabularyResolver;

/// Conversion of a provider record into the canonical model
pub trait ToCanonical {
    fn to_canonical(&self, ctx: &TransformContext) -> CanonicalObservation;
}

impl ToCanonical for VerbatimRecord {
    fn to_canonical(&self, ctx: &TransformContext) -> CanonicalObservation {
        match self {
            VerbatimRecord::Dwc(record) => record.to_canonical(ctx),
            VerbatimRecord::Nors(record) => record.to_canonical(ctx),
        }
    }
}

#[derive(Debug)]
struct ReferenceData {
    vocabularies: VocabularyResolver,
    taxa: TaxonIndex,
}

/// Read-only snapshot of reference data plus the dataset being transformed
#[derive(Debug, Clone)]
pub struct TransformContext {
    reference: Arc<ReferenceData>,
    pub data_provider_id: i32,
    pub dataset_id: String,
}

impl TransformContext {
    pub fn new(vocabularies: &[Vocabulary], taxa: Vec<Taxon>) -> Result<Self> {
        Ok(Self {
            reference: Arc::new(ReferenceData {
                vocabularies: VocabularyResolver::new(vocabularies),
                taxa: TaxonIndex::new(taxa)?,
            }),
            data_provider_id: 0,
            dataset_id: String::new(),
        })
    }

    /// Build the snapshot from the `vocabularies` and `taxa` collections
    pub async fn load(store: &dyn DocumentStore, page_size: usize) -> Result<Self> {
        let vocabularies: Vec<Vocabulary> = load_all(store, VOCABULARIES, page_size).await?;
        let taxa: Vec<Taxon> = load_all(store, TAXA, page_size).await?;
        info!(
            vocabularies = vocabularies.len(),
            taxa = taxa.len(),
            "Loaded transformation reference data"
        );
        Self::new(&vocabularies, taxa)
    }

    /// Same reference data, scoped to one dataset
    pub fn for_dataset(&self, data_provider_id: i32, dataset_id: &str) -> Self {
        Self {
            reference: Arc::clone(&self.reference),
            data_provider_id,
            dataset_id: dataset_id.to_string(),
        }
    }

    pub fn vocabularies(&self) -> &VocabularyResolver {
        &self.reference.vocabularies
    }

    pub fn taxa(&self) -> &TaxonIndex {
        &self.reference.taxa
    }

    pub fn transform(&self, record: &VerbatimRecord) -> CanonicalObservation {
        record.to_canonical(self)
    }
}
