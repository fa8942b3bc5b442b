//! Reference data import
//!
//! Vocabularies, taxa and area polygons are maintained outside the harvest
//! and loaded from JSON array files into the shared collections. Each
//! document gets a stable `_id` so repeated imports replace the previous
//! version instead of duplicating it.

use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

use crate::error::{HarvestError, Result};
use crate::models::{AreaFeature, Taxon, Vocabulary};
use crate::store::repositories::{to_document, AREAS, TAXA, VOCABULARIES};
use crate::store::ID_FIELD;
use crate::writer::BatchWriter;

/// Read a file holding one JSON array
pub fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| HarvestError::Parse(format!("{}: {}", path.display(), e)))
}

pub fn area_document_id(area: &AreaFeature) -> String {
    format!("{:?}-{}", area.area_type, area.feature_id)
}

pub async fn import_vocabularies(writer: &BatchWriter, vocabularies: &[Vocabulary]) -> Result<usize> {
    let docs = vocabularies
        .iter()
        .map(|v| to_document(v, v.field.as_str()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let written = writer.upsert_many(VOCABULARIES, &docs, ID_FIELD).await?;
    info!(written, "Imported vocabularies");
    Ok(written)
}

pub async fn import_taxa(writer: &BatchWriter, taxa: &[Taxon]) -> Result<usize> {
    let docs = taxa
        .iter()
        .map(|t| to_document(t, t.id.to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let written = writer.upsert_many(TAXA, &docs, ID_FIELD).await?;
    info!(written, "Imported taxa");
    Ok(written)
}

pub async fn import_areas(writer: &BatchWriter, areas: &[AreaFeature]) -> Result<usize> {
    let docs = areas
        .iter()
        .map(|a| to_document(a, area_document_id(a)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let written = writer.upsert_many(AREAS, &docs, ID_FIELD).await?;
    info!(written, "Imported areas");
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{AreaType, VocabularyEntry, VocabularyField};
    use crate::store::{DocumentStore, InMemoryStore};
    use crate::transform::TransformContext;
    use crate::writer::WriterConfig;
    use geo::{polygon, MultiPolygon};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reimport_replaces_documents() {
        let store = Arc::new(InMemoryStore::new());
        let writer = BatchWriter::new(store.clone(), WriterConfig::default());

        let mut sex = Vocabulary {
            field: VocabularyField::Sex,
            values: vec![VocabularyEntry {
                id: 1,
                value: "male".to_string(),
                aliases: vec![],
            }],
        };
        import_vocabularies(&writer, std::slice::from_ref(&sex)).await.unwrap();
        sex.values[0].aliases.push("hane".to_string());
        import_vocabularies(&writer, &[sex]).await.unwrap();

        let taxa = vec![Taxon {
            id: 100024,
            scientific_name: "Haliaeetus albicilla".to_string(),
            vernacular_name: Some("havsörn".to_string()),
            taxon_rank: Some("species".to_string()),
            synonyms: vec![],
        }];
        import_taxa(&writer, &taxa).await.unwrap();
        import_taxa(&writer, &taxa).await.unwrap();

        assert_eq!(store.count_documents(VOCABULARIES).await.unwrap(), 1);
        assert_eq!(store.count_documents(TAXA).await.unwrap(), 1);

        let context = TransformContext::load(store.as_ref(), 100).await.unwrap();
        assert_eq!(context.taxa().len(), 1);
        let resolved = context
            .vocabularies()
            .resolve(VocabularyField::Sex, Some("Hane"))
            .unwrap();
        assert_eq!(resolved.id, 1);
    }

    #[tokio::test]
    async fn test_area_ids_include_type() {
        let store = Arc::new(InMemoryStore::new());
        let writer = BatchWriter::new(store.clone(), WriterConfig::default());
        let square = MultiPolygon::new(vec![polygon![
            (x: 15.0, y: 58.0),
            (x: 17.0, y: 58.0),
            (x: 17.0, y: 59.0),
            (x: 15.0, y: 59.0),
        ]]);
        let areas = vec![
            AreaFeature {
                area_type: AreaType::County,
                feature_id: "5".to_string(),
                name: "Östergötland".to_string(),
                geometry: square.clone(),
            },
            AreaFeature {
                area_type: AreaType::Province,
                feature_id: "5".to_string(),
                name: "Östergötland".to_string(),
                geometry: square,
            },
        ];

        assert_eq!(area_document_id(&areas[0]), "County-5");
        assert_eq!(import_areas(&writer, &areas).await.unwrap(), 2);
        assert_eq!(store.count_documents(AREAS).await.unwrap(), 2);
    }

    #[test]
    fn test_read_json_array_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxa.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        let err = read_json_array::<Taxon>(&path).unwrap_err();
        assert!(err.to_string().contains("taxa.json"));
    }
}
