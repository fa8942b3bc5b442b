//! Darwin Core mapping

use super::fields::{
    apply_coordinate, parse_date_interval, parse_datetime, parse_f64, parse_i32, text,
    OccurrenceFlags,
};
use super::vocabulary::ids;
use super::{ToCanonical, TransformContext};
use crate::models::{
    CanonicalObservation, Event, GeologicalContext, Identification, Location, ObservationTaxon,
    Occurrence, Organism, VocabularyField,
};
use crate::verbatim::DwcVerbatimObservation;

const VERIFIED_STATUSES: [&str; 3] = ["verified", "validated", "approved"];

impl DwcVerbatimObservation {
    fn event(&self) -> Event {
        let (start_date, end_date) = parse_date_interval(&self.event_date);
        Event {
            event_id: text(&self.event_id),
            parent_event_id: text(&self.parent_event_id),
            start_date,
            end_date,
            verbatim_event_date: text(&self.event_date),
            habitat: text(&self.habitat),
            sampling_protocol: text(&self.sampling_protocol),
            sampling_effort: text(&self.sampling_effort),
            event_remarks: text(&self.event_remarks),
        }
    }

    fn location(&self, ctx: &TransformContext) -> Location {
        let vocabularies = ctx.vocabularies();
        let mut location = Location {
            location_id: text(&self.location_id),
            locality: text(&self.locality),
            verbatim_longitude: text(&self.verbatim_longitude).or_else(|| text(&self.decimal_longitude)),
            verbatim_latitude: text(&self.verbatim_latitude).or_else(|| text(&self.decimal_latitude)),
            continent: Some(vocabularies.resolve_or_default(
                VocabularyField::Continent,
                self.continent.as_deref(),
                ids::CONTINENT_EUROPE,
            )),
            country: vocabularies.resolve(VocabularyField::Country, self.country.as_deref()),
            country_code: text(&self.country_code),
            minimum_elevation_in_meters: parse_f64(&self.minimum_elevation_in_meters),
            maximum_elevation_in_meters: parse_f64(&self.maximum_elevation_in_meters),
            minimum_depth_in_meters: parse_f64(&self.minimum_depth_in_meters),
            maximum_depth_in_meters: parse_f64(&self.maximum_depth_in_meters),
            ..Default::default()
        };

        let uncertainty = parse_i32(&self.coordinate_uncertainty_in_meters);
        let decimal = (parse_f64(&self.decimal_longitude), parse_f64(&self.decimal_latitude));
        let verbatim = (parse_f64(&self.verbatim_longitude), parse_f64(&self.verbatim_latitude));

        match (decimal, verbatim) {
            ((Some(x), Some(y)), _) => apply_coordinate(
                &mut location,
                x,
                y,
                self.geodetic_datum.as_deref(),
                uncertainty,
            ),
            (_, (Some(x), Some(y))) => apply_coordinate(
                &mut location,
                x,
                y,
                self.verbatim_srs.as_deref().or(self.geodetic_datum.as_deref()),
                uncertainty,
            ),
            _ => {}
        }

        location
    }

    fn identification(&self) -> Identification {
        let verified = text(&self.identification_verification_status)
            .map(|status| {
                let status = status.to_lowercase();
                VERIFIED_STATUSES.iter().any(|v| status.starts_with(v))
            })
            .unwrap_or(false);

        Identification {
            identified_by: text(&self.identified_by),
            date_identified: text(&self.date_identified),
            identification_remarks: text(&self.identification_remarks),
            verified,
            uncertain_identification: text(&self.identification_qualifier).is_some(),
            verbatim_taxon_id: text(&self.taxon_id),
            verbatim_scientific_name: text(&self.scientific_name),
        }
    }

    fn occurrence(&self, ctx: &TransformContext) -> Occurrence {
        let vocabularies = ctx.vocabularies();
        let occurrence_status =
            vocabularies.resolve(VocabularyField::OccurrenceStatus, self.occurrence_status.as_deref());
        let flags = OccurrenceFlags::from_status(occurrence_status.as_ref());

        Occurrence {
            occurrence_id: text(&self.occurrence_id),
            catalog_number: text(&self.catalog_number),
            record_number: text(&self.record_number),
            recorded_by: text(&self.recorded_by),
            individual_count: text(&self.individual_count),
            organism_quantity: text(&self.organism_quantity),
            organism_quantity_int: parse_i32(&self.organism_quantity)
                .or_else(|| parse_i32(&self.individual_count)),
            organism_quantity_unit: vocabularies
                .resolve(VocabularyField::Unit, self.organism_quantity_type.as_deref()),
            sex: vocabularies.resolve(VocabularyField::Sex, self.sex.as_deref()),
            life_stage: vocabularies.resolve(VocabularyField::LifeStage, self.life_stage.as_deref()),
            reproductive_condition: vocabularies.resolve(
                VocabularyField::ReproductiveCondition,
                self.reproductive_condition.as_deref(),
            ),
            behavior: vocabularies.resolve(VocabularyField::Behavior, self.behavior.as_deref()),
            establishment_means: vocabularies.resolve(
                VocabularyField::EstablishmentMeans,
                self.establishment_means.as_deref(),
            ),
            occurrence_status,
            occurrence_remarks: text(&self.occurrence_remarks),
            url: text(&self.references),
            is_positive_observation: flags.is_positive,
            is_never_found_observation: flags.is_never_found,
            is_natural_occurrence: flags.is_natural,
            is_not_rediscovered_observation: flags.is_not_rediscovered,
        }
    }

    fn geological_context(&self) -> Option<GeologicalContext> {
        let context = GeologicalContext {
            earliest_eon_or_lowest_eonothem: text(&self.earliest_eon_or_lowest_eonothem),
            earliest_era_or_lowest_erathem: text(&self.earliest_era_or_lowest_erathem),
            earliest_period_or_lowest_system: text(&self.earliest_period_or_lowest_system),
            earliest_epoch_or_lowest_series: text(&self.earliest_epoch_or_lowest_series),
            latest_era_or_highest_erathem: text(&self.latest_era_or_highest_erathem),
            lithostratigraphic_terms: text(&self.lithostratigraphic_terms),
            formation: text(&self.formation),
            bed: text(&self.bed),
        };
        (!context.is_empty()).then_some(context)
    }
}

impl ToCanonical for DwcVerbatimObservation {
    fn to_canonical(&self, ctx: &TransformContext) -> CanonicalObservation {
        let vocabularies = ctx.vocabularies();
        let taxon = ctx
            .taxa()
            .resolve(self.taxon_id.as_deref(), self.scientific_name.as_deref())
            .map(ObservationTaxon::from);

        CanonicalObservation {
            id: None,
            data_provider_id: ctx.data_provider_id,
            dataset_id: ctx.dataset_id.clone(),
            dataset_name: text(&self.dataset_name),
            basis_of_record: vocabularies
                .resolve(VocabularyField::BasisOfRecord, self.basis_of_record.as_deref()),
            access_rights: vocabularies
                .resolve(VocabularyField::AccessRights, self.access_rights.as_deref()),
            rights_holder: text(&self.rights_holder),
            institution_code: text(&self.institution_code),
            collection_code: text(&self.collection_code),
            language: text(&self.language),
            modified: text(&self.modified).and_then(|m| parse_datetime(&m)),
            event: self.event(),
            location: self.location(ctx),
            identification: self.identification(),
            occurrence: self.occurrence(ctx),
            organism: Organism {
                organism_id: text(&self.organism_id),
                organism_name: text(&self.organism_name),
                organism_scope: text(&self.organism_scope),
                organism_remarks: text(&self.organism_remarks),
            },
            geological_context: self.geological_context(),
            taxon,
        }
    }
}
