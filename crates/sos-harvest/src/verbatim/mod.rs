//! Provider-native records as delivered by the package readers
//!
//! Each provider format is a closed struct; [`VerbatimRecord`] is the tagged
//! union the pipeline streams. Conversion to the canonical model lives in
//! [`crate::transform`].

pub mod dwc;
pub mod nors;

pub use dwc::DwcVerbatimObservation;
pub use nors::NorsVerbatimObservation;

/// One provider-native record
#[derive(Debug, Clone, PartialEq)]
pub enum VerbatimRecord {
    Dwc(DwcVerbatimObservation),
    Nors(NorsVerbatimObservation),
}

impl VerbatimRecord {
    /// Monotonic id assigned by the reader, used for ordering and resume
    pub fn record_id(&self) -> u64 {
        match self {
            VerbatimRecord::Dwc(r) => r.record_id,
            VerbatimRecord::Nors(r) => r.record_id,
        }
    }

    /// Id the provider uses for this record
    pub fn native_id(&self) -> Option<&str> {
        match self {
            VerbatimRecord::Dwc(r) => r.occurrence_id.as_deref(),
            VerbatimRecord::Nors(r) => Some(r.observation_id.as_str()),
        }
    }
}

impl From<DwcVerbatimObservation> for VerbatimRecord {
    fn from(record: DwcVerbatimObservation) -> Self {
        VerbatimRecord::Dwc(record)
    }
}

impl From<NorsVerbatimObservation> for VerbatimRecord {
    fn from(record: NorsVerbatimObservation) -> Self {
        VerbatimRecord::Nors(record)
    }
}
