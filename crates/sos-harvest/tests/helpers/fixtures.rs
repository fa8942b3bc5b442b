//! Test fixtures for harvest integration tests
//!
//! Reference data is a small but realistic slice: a handful of vocabularies,
//! taxa with a shared synonym, and rectangular stand-ins for Swedish areas.

use geo::{polygon, MultiPolygon};
use sos_harvest::enrich::{AreaIndexBuilder, PositionAreaCache};
use sos_harvest::models::{
    AreaFeature, AreaType, DataProviderDescriptor, DatasetDescriptor, PackageFormat, Taxon,
    Vocabulary, VocabularyEntry, VocabularyField,
};
use sos_harvest::verbatim::NorsVerbatimObservation;
use sos_harvest::{AreaEnricher, TransformContext, VerbatimRecord};
use std::path::PathBuf;

// ============================================================================
// Vocabularies and taxa
// ============================================================================

fn entry(id: i32, value: &str, aliases: &[&str]) -> VocabularyEntry {
    VocabularyEntry {
        id,
        value: value.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

pub fn vocabularies() -> Vec<Vocabulary> {
    vec![
        Vocabulary {
            field: VocabularyField::OccurrenceStatus,
            values: vec![
                entry(0, "present", &["observed", "förekommer"]),
                entry(1, "absent", &["not found", "saknas"]),
            ],
        },
        Vocabulary {
            field: VocabularyField::Sex,
            values: vec![entry(1, "male", &["hane"]), entry(2, "female", &["hona"])],
        },
        Vocabulary {
            field: VocabularyField::Continent,
            values: vec![entry(4, "Europe", &["europa"])],
        },
        Vocabulary {
            field: VocabularyField::Country,
            values: vec![entry(0, "Sweden", &["sverige"])],
        },
        Vocabulary {
            field: VocabularyField::BasisOfRecord,
            values: vec![entry(0, "HumanObservation", &[])],
        },
    ]
}

pub fn taxon(id: i32, scientific_name: &str, synonyms: &[&str]) -> Taxon {
    Taxon {
        id,
        scientific_name: scientific_name.to_string(),
        vernacular_name: None,
        taxon_rank: Some("species".to_string()),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn taxa() -> Vec<Taxon> {
    vec![
        taxon(100024, "Haliaeetus albicilla", &["Falco albicilla"]),
        taxon(100067, "Perca fluviatilis", &[]),
        taxon(233622, "Pica pica", &["Corvus pica", "Pica caudata"]),
        taxon(233623, "Pica serica", &["Pica caudata"]),
    ]
}

pub fn transform_context() -> TransformContext {
    TransformContext::new(&vocabularies(), taxa()).expect("reference data")
}

// ============================================================================
// Areas
// ============================================================================

pub fn rectangle(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: min_lon, y: min_lat),
        (x: max_lon, y: min_lat),
        (x: max_lon, y: max_lat),
        (x: min_lon, y: max_lat),
    ]])
}

pub fn area(area_type: AreaType, feature_id: &str, name: &str, geometry: MultiPolygon<f64>) -> AreaFeature {
    AreaFeature {
        area_type,
        feature_id: feature_id.to_string(),
        name: name.to_string(),
        geometry,
    }
}

/// Coarse boxes around a few Swedish counties, provinces and municipalities
pub fn swedish_areas() -> Vec<AreaFeature> {
    vec![
        area(AreaType::County, "5", "Östergötland", rectangle(14.5, 57.6, 17.5, 59.0)),
        area(AreaType::Province, "4", "Östergötland", rectangle(14.5, 57.6, 17.5, 59.0)),
        area(AreaType::Municipality, "580", "Linköping", rectangle(15.3, 57.9, 16.2, 58.6)),
        area(AreaType::Parish, "58001", "Linköpings domkyrkoförsamling", rectangle(15.55, 58.35, 15.7, 58.45)),
        area(AreaType::County, "8", "Kalmar", rectangle(15.5, 56.2, 17.2, 57.5)),
        area(AreaType::Province, "3", "Småland", rectangle(13.0, 56.2, 16.4, 57.5)),
        area(AreaType::Province, "6", "Öland", rectangle(16.4, 56.2, 17.2, 57.4)),
        area(AreaType::County, "24", "Västerbotten", rectangle(14.0, 63.5, 21.0, 66.0)),
        area(AreaType::Province, "27", "Lycksele lappmark", rectangle(14.0, 64.0, 19.0, 65.5)),
        area(AreaType::EconomicZone, "100", "Sverige ekonomisk zon", rectangle(10.0, 55.0, 25.0, 70.0)),
    ]
}

pub fn enricher(cache_file: Option<PathBuf>) -> AreaEnricher {
    let mut builder = AreaIndexBuilder::new();
    for feature in swedish_areas() {
        builder.add(feature);
    }
    AreaEnricher::new(builder.build(), PositionAreaCache::new(), cache_file)
}

// ============================================================================
// Providers and records
// ============================================================================

pub fn dataset(identifier: &str, data_url: Option<&str>, metadata_url: Option<&str>) -> DatasetDescriptor {
    DatasetDescriptor {
        identifier: identifier.to_string(),
        data_url: data_url.map(str::to_string),
        metadata_url: metadata_url.map(str::to_string),
        dataset_type: Default::default(),
        format: PackageFormat::NorsJson,
        retain_source: false,
        source_date: None,
    }
}

pub fn provider(id: i32, identifier: &str, datasets: Vec<DatasetDescriptor>) -> DataProviderDescriptor {
    DataProviderDescriptor {
        id,
        identifier: identifier.to_string(),
        name: identifier.to_uppercase(),
        datasets,
    }
}

/// Perch caught near Linköping
pub fn nors_record(record_id: u64) -> NorsVerbatimObservation {
    NorsVerbatimObservation {
        record_id,
        observation_id: format!("nors-{}", record_id),
        dyntaxa_taxon_id: Some(100067),
        scientific_name: Some("Perca fluviatilis".to_string()),
        start: Some("2023-08-14".to_string()),
        coordinate_x: Some(15.62),
        coordinate_y: Some(58.41),
        coordinate_system: Some("EPSG:4326".to_string()),
        occurrence_status: Some("present".to_string()),
        ..Default::default()
    }
}

pub fn nors_records(count: u64) -> Vec<VerbatimRecord> {
    (1..=count).map(|i| nors_record(i).into()).collect()
}

/// Minimal EML document with a publication date
pub fn eml(pub_date: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<eml:eml xmlns:eml="eml://ecoinformatics.org/eml-2.1.1" packageId="nors-fish">
  <dataset>
    <title>NORS fish survey</title>
    <pubDate>{}</pubDate>
  </dataset>
</eml:eml>"#,
        pub_date
    )
}
