//! Publication timestamp of an EML metadata document

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{HarvestError, Result};
use crate::transform::fields::parse_datetime;

/// First `<pubDate>` of the document, falling back to the first `<dateStamp>`
///
/// Returns `Ok(None)` when neither element carries a parseable date.
pub fn publication_date(document: &str) -> Result<Option<DateTime<Utc>>> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut current: Option<&'static str> = None;
    let mut pub_date: Option<DateTime<Utc>> = None;
    let mut date_stamp: Option<DateTime<Utc>> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                current = match e.local_name().as_ref() {
                    b"pubDate" => Some("pubDate"),
                    b"dateStamp" => Some("dateStamp"),
                    _ => None,
                };
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| HarvestError::Metadata(e.to_string()))?;
                match current {
                    Some("pubDate") if pub_date.is_none() => pub_date = parse_datetime(&text),
                    Some("dateStamp") if date_stamp.is_none() => date_stamp = parse_datetime(&text),
                    _ => {}
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }

        if pub_date.is_some() {
            break;
        }
    }

    Ok(pub_date.or(date_stamp))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pub_date() {
        let eml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <eml:eml xmlns:eml="eml://ecoinformatics.org/eml-2.1.1">
              <dataset>
                <title>Bird ringing</title>
                <pubDate>
                  2024-02-15
                </pubDate>
              </dataset>
              <additionalMetadata><metadata><gbif><dateStamp>2024-03-01T10:00:00Z</dateStamp></gbif></metadata></additionalMetadata>
            </eml:eml>"#;

        assert_eq!(
            publication_date(eml).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_date_stamp_fallback() {
        let eml = "<eml><additionalMetadata><metadata><gbif><dateStamp>2024-03-01T10:00:00Z</dateStamp></gbif></metadata></additionalMetadata></eml>";
        assert_eq!(
            publication_date(eml).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_no_dates() {
        assert_eq!(publication_date("<eml><dataset/></eml>").unwrap(), None);
        assert!(publication_date("<eml><dataset></eml>").is_err());
    }
}
