//! Verbatim to canonical transformation across both provider formats

mod helpers;

use chrono::{TimeZone, Utc};
use geo::BoundingRect;
use helpers::{nors_record, transform_context};
use sos_harvest::models::VocabularyValue;
use sos_harvest::verbatim::DwcVerbatimObservation;
use sos_harvest::VerbatimRecord;

fn dwc() -> DwcVerbatimObservation {
    DwcVerbatimObservation {
        record_id: 1,
        occurrence_id: Some("urn:lsid:artportalen.se:sighting:98571703".to_string()),
        basis_of_record: Some("HumanObservation".to_string()),
        scientific_name: Some("Haliaeetus albicilla".to_string()),
        event_date: Some("2023-05-01/2023-05-03".to_string()),
        decimal_longitude: Some("15.62".to_string()),
        decimal_latitude: Some("58.41".to_string()),
        geodetic_datum: Some("WGS84".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_dataset_scope_is_stamped_on_every_record() {
    let ctx = transform_context().for_dataset(7, "artportalen-dwca");
    let obs = ctx.transform(&VerbatimRecord::Dwc(dwc()));

    assert_eq!(obs.data_provider_id, 7);
    assert_eq!(obs.dataset_id, "artportalen-dwca");
    assert_eq!(
        obs.occurrence.occurrence_id.as_deref(),
        Some("urn:lsid:artportalen.se:sighting:98571703")
    );
    assert_eq!(obs.event.start_date, Some(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()));
    assert_eq!(obs.event.end_date, Some(Utc.with_ymd_and_hms(2023, 5, 3, 0, 0, 0).unwrap()));
}

#[test]
fn test_vocabulary_values_fall_back_to_sentinel() {
    let ctx = transform_context();

    let mut record = dwc();
    record.sex = Some("Hona".to_string());
    let obs = ctx.transform(&record.clone().into());
    assert_eq!(obs.occurrence.sex, Some(VocabularyValue::mapped(2)));

    record.sex = Some("hermaphrodite".to_string());
    let obs = ctx.transform(&record.clone().into());
    let sex = obs.occurrence.sex.unwrap();
    assert_eq!(sex.id, VocabularyValue::NO_MAPPING_FOUND_ID);
    assert_eq!(sex.value.as_deref(), Some("hermaphrodite"));

    record.sex = Some("   ".to_string());
    let obs = ctx.transform(&record.into());
    assert!(obs.occurrence.sex.is_none());

    // Continent defaults to Europe when the record is silent
    assert_eq!(obs.location.continent.as_ref().map(|c| c.id), Some(4));
}

#[test]
fn test_taxon_id_wins_over_name() {
    let ctx = transform_context();

    let mut record = dwc();
    record.taxon_id = Some("urn:lsid:dyntaxa.se:Taxon:100024".to_string());
    record.scientific_name = Some("Perca fluviatilis".to_string());
    let obs = ctx.transform(&record.clone().into());
    assert_eq!(obs.taxon.as_ref().map(|t| t.id), Some(100024));
    assert_eq!(
        obs.identification.verbatim_taxon_id.as_deref(),
        Some("urn:lsid:dyntaxa.se:Taxon:100024")
    );

    // Unknown id falls through to the name
    record.taxon_id = Some("999999".to_string());
    let obs = ctx.transform(&record.into());
    assert_eq!(obs.taxon.as_ref().map(|t| t.id), Some(100067));
}

#[test]
fn test_taxon_name_and_synonym_must_be_unique() {
    let ctx = transform_context();
    let resolve = |name: &str| {
        let mut record = dwc();
        record.scientific_name = Some(name.to_string());
        ctx.transform(&record.into()).taxon.map(|t| t.id)
    };

    assert_eq!(resolve("haliaeetus ALBICILLA"), Some(100024));
    assert_eq!(resolve("Falco albicilla"), Some(100024));
    assert_eq!(resolve("Corvus pica"), Some(233622));
    // Shared by two taxa
    assert_eq!(resolve("Pica caudata"), None);
    assert_eq!(resolve("Nomen nudum"), None);
}

#[test]
fn test_absent_status_marks_negative_observation() {
    let ctx = transform_context();

    let mut record = dwc();
    record.occurrence_status = Some("saknas".to_string());
    let obs = ctx.transform(&record.clone().into());
    assert!(!obs.occurrence.is_positive_observation);
    assert!(obs.occurrence.is_never_found_observation);

    record.occurrence_status = Some("present".to_string());
    let obs = ctx.transform(&record.into());
    assert!(obs.occurrence.is_positive_observation);
    assert!(!obs.occurrence.is_never_found_observation);
    assert!(obs.occurrence.is_natural_occurrence);
}

#[test]
fn test_provider_override_beats_status() {
    let ctx = transform_context();

    let mut record = nors_record(1);
    record.is_positive_observation = Some(false);
    record.is_natural_occurrence = Some(false);
    let obs = ctx.transform(&record.into());

    assert!(!obs.occurrence.is_positive_observation);
    assert!(obs.occurrence.is_never_found_observation);
    assert!(!obs.occurrence.is_natural_occurrence);
}

#[test]
fn test_sweref99_tm_is_reprojected_with_default_buffer() {
    let ctx = transform_context();

    let mut record = dwc();
    record.decimal_longitude = None;
    record.decimal_latitude = None;
    record.geodetic_datum = None;
    record.verbatim_longitude = Some("674032".to_string());
    record.verbatim_latitude = Some("6580822".to_string());
    record.verbatim_srs = Some("EPSG:3006".to_string());

    let obs = ctx.transform(&record.into());
    let (lon, lat) = obs.location.coordinate().unwrap();
    assert!((lon - 18.0592).abs() < 1e-3, "lon {lon}");
    assert!((lat - 59.3302).abs() < 1e-3, "lat {lat}");
    assert_eq!(obs.location.geodetic_datum.as_deref(), Some("EPSG:4326"));
    assert_eq!(obs.location.verbatim_srs.as_deref(), Some("EPSG:3006"));
    assert_eq!(obs.location.verbatim_longitude.as_deref(), Some("674032"));

    // 5 km radius spans roughly 0.09 degrees of latitude
    let bounds = obs.location.point_with_buffer.unwrap().bounding_rect().unwrap();
    let height = bounds.max().y - bounds.min().y;
    assert!((height - 0.0898).abs() < 0.002, "height {height}");
}

#[test]
fn test_unknown_reference_system_drops_coordinate() {
    let ctx = transform_context();

    let mut record = nors_record(1);
    record.coordinate_x = Some(1_500_000.0);
    record.coordinate_y = Some(6_500_000.0);
    record.coordinate_system = Some("EPSG:99999".to_string());
    let obs = ctx.transform(&record.into());

    assert!(obs.location.coordinate().is_none());
    assert!(obs.location.point_with_buffer.is_none());
    assert_eq!(obs.location.verbatim_srs.as_deref(), Some("EPSG:99999"));
    assert_eq!(obs.location.verbatim_longitude.as_deref(), Some("1500000"));
}

#[test]
fn test_nors_record_maps_to_swedish_fish_observation() {
    let ctx = transform_context().for_dataset(9, "nors-fish");
    let obs = ctx.transform(&nors_record(12).into());

    assert_eq!(obs.event.event_id.as_deref(), Some("nors-12"));
    assert_eq!(obs.taxon.as_ref().map(|t| t.scientific_name.clone()), Some("Perca fluviatilis".to_string()));
    assert_eq!(obs.location.country_code.as_deref(), Some("SE"));
    assert_eq!(obs.location.country.as_ref().map(|c| c.id), Some(0));
    assert_eq!(obs.location.coordinate(), Some((15.62, 58.41)));
    assert_eq!(obs.location.coordinate_uncertainty_in_meters, None);
    assert!(obs.location.point_with_buffer.is_some());
}
