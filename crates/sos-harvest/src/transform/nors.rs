//! NORS fish survey mapping

use super::fields::{apply_coordinate, parse_datetime, text, OccurrenceFlags};
use super::vocabulary::ids;
use super::{ToCanonical, TransformContext};
use crate::models::{
    CanonicalObservation, Event, Identification, Location, ObservationTaxon, Occurrence,
    VocabularyField,
};
use crate::verbatim::NorsVerbatimObservation;

const BASIS_OF_RECORD: &str = "HumanObservation";
const COUNTRY: &str = "Sweden";
const COUNTRY_CODE: &str = "SE";

impl ToCanonical for NorsVerbatimObservation {
    fn to_canonical(&self, ctx: &TransformContext) -> CanonicalObservation {
        let vocabularies = ctx.vocabularies();
        let verbatim_taxon_id = self.dyntaxa_taxon_id.map(|id| id.to_string());

        let mut location = Location {
            location_id: text(&self.location_id),
            locality: text(&self.locality),
            verbatim_longitude: self.coordinate_x.map(|x| x.to_string()),
            verbatim_latitude: self.coordinate_y.map(|y| y.to_string()),
            continent: Some(vocabularies.resolve_or_default(
                VocabularyField::Continent,
                None,
                ids::CONTINENT_EUROPE,
            )),
            country: Some(vocabularies.resolve_or_default(
                VocabularyField::Country,
                Some(COUNTRY),
                ids::COUNTRY_SWEDEN,
            )),
            country_code: Some(COUNTRY_CODE.to_string()),
            ..Default::default()
        };
        if let (Some(x), Some(y)) = (self.coordinate_x, self.coordinate_y) {
            apply_coordinate(
                &mut location,
                x,
                y,
                self.coordinate_system.as_deref(),
                self.coordinate_uncertainty_in_meters,
            );
        }

        let occurrence_status =
            vocabularies.resolve(VocabularyField::OccurrenceStatus, self.occurrence_status.as_deref());
        let flags = OccurrenceFlags::from_status(occurrence_status.as_ref()).with_overrides(
            self.is_positive_observation,
            self.is_natural_occurrence,
            self.is_not_rediscovered_observation,
        );

        let start_date = self.start.as_deref().and_then(parse_datetime);
        let end_date = self.end.as_deref().and_then(parse_datetime).or(start_date);

        CanonicalObservation {
            id: None,
            data_provider_id: ctx.data_provider_id,
            dataset_id: ctx.dataset_id.clone(),
            basis_of_record: vocabularies.resolve(VocabularyField::BasisOfRecord, Some(BASIS_OF_RECORD)),
            institution_code: text(&self.institution_code),
            collection_code: text(&self.collection_code),
            modified: self.modified.as_deref().and_then(parse_datetime),
            event: Event {
                event_id: Some(self.observation_id.clone()),
                start_date,
                end_date,
                sampling_protocol: text(&self.sampling_protocol),
                ..Default::default()
            },
            location,
            identification: Identification {
                verbatim_taxon_id: verbatim_taxon_id.clone(),
                verbatim_scientific_name: text(&self.scientific_name),
                ..Default::default()
            },
            occurrence: Occurrence {
                occurrence_id: Some(self.observation_id.clone()),
                recorded_by: text(&self.recorded_by),
                individual_count: self.individual_count.map(|c| c.to_string()),
                organism_quantity_int: self.individual_count,
                occurrence_status,
                is_positive_observation: flags.is_positive,
                is_never_found_observation: flags.is_never_found,
                is_natural_occurrence: flags.is_natural,
                is_not_rediscovered_observation: flags.is_not_rediscovered,
                ..Default::default()
            },
            taxon: ctx
                .taxa()
                .resolve(verbatim_taxon_id.as_deref(), self.scientific_name.as_deref())
                .map(ObservationTaxon::from),
            ..Default::default()
        }
    }
}
