//! Domain models shared by every pipeline stage

pub mod area;
pub mod harvest;
pub mod observation;
pub mod provider;
pub mod taxon;
pub mod vocabulary;

pub use area::{AreaFeature, AreaRef, AreaType, PositionAreaCacheEntry};
pub use harvest::{summarize_runs, DatasetReport, HarvestReport, HarvestRun, RunStatus, NOT_COUNTED};
pub use observation::{
    CanonicalObservation, Event, GeologicalContext, Identification, Location, ObservationTaxon,
    Occurrence, Organism,
};
pub use provider::{DataProviderDescriptor, DatasetDescriptor, DatasetType, PackageFormat};
pub use taxon::Taxon;
pub use vocabulary::{Vocabulary, VocabularyEntry, VocabularyField, VocabularyValue};
