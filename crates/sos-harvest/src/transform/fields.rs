//! Field level conversions shared by the provider mappings

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use super::coordinates::{self, CoordinateError, DEFAULT_UNCERTAINTY_METERS};
use super::vocabulary::ids;
use crate::models::{Location, VocabularyValue};

/// Trimmed text, `None` when blank
pub fn text(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Decimal number; accepts a comma as decimal separator
pub fn parse_f64(raw: &Option<String>) -> Option<f64> {
    text(raw)?.replace(',', ".").parse().ok().filter(|v: &f64| v.is_finite())
}

pub fn parse_i32(raw: &Option<String>) -> Option<i32> {
    let value = text(raw)?;
    value
        .parse::<i32>()
        .ok()
        .or_else(|| value.replace(',', ".").parse::<f64>().ok().map(|v| v.round() as i32))
}

/// Timestamp in RFC 3339, `YYYY-MM-DD HH:MM:SS` or plain `YYYY-MM-DD` (midnight UTC)
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Start and end of a Darwin Core date, which may be an ISO interval `start/end`
pub fn parse_date_interval(raw: &Option<String>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let Some(value) = text(raw) else {
        return (None, None);
    };
    match value.split_once('/') {
        Some((start, end)) => {
            let start = parse_datetime(start);
            (start, parse_datetime(end).or(start))
        }
        None => {
            let date = parse_datetime(&value);
            (date, date)
        }
    }
}

/// Set the canonical coordinate and buffer from a point in a declared reference
///
/// Unknown references keep the declared text in `verbatim_srs` and leave the
/// canonical coordinate empty.
pub fn apply_coordinate(
    location: &mut Location,
    x: f64,
    y: f64,
    declared: Option<&str>,
    uncertainty: Option<i32>,
) {
    if let Some(declared) = declared.map(str::trim).filter(|d| !d.is_empty()) {
        location.verbatim_srs = Some(declared.to_string());
    }

    match coordinates::normalize(x, y, declared) {
        Ok((lon, lat)) => {
            let radius = uncertainty
                .filter(|u| *u > 0)
                .unwrap_or(DEFAULT_UNCERTAINTY_METERS);
            location.decimal_longitude = Some(lon);
            location.decimal_latitude = Some(lat);
            location.geodetic_datum = Some("EPSG:4326".to_string());
            location.coordinate_uncertainty_in_meters = uncertainty;
            location.point_with_buffer = Some(coordinates::point_with_buffer(lon, lat, radius as f64));
        }
        Err(CoordinateError::UnknownSystem(srs)) => {
            debug!(srs = %srs, "Dropping coordinate in unrecognised reference system");
        }
        Err(e) => {
            debug!(error = %e, "Dropping invalid coordinate");
        }
    }
}

/// Positive/negative classification of an occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceFlags {
    pub is_positive: bool,
    pub is_never_found: bool,
    pub is_natural: bool,
    pub is_not_rediscovered: bool,
}

impl OccurrenceFlags {
    /// Defaults implied by the occurrence status
    pub fn from_status(status: Option<&VocabularyValue>) -> Self {
        let absent = status.map_or(false, |s| {
            s.id == ids::OCCURRENCE_STATUS_ABSENT
                || (!s.is_mapped()
                    && s.value
                        .as_deref()
                        .map_or(false, |v| v.trim().eq_ignore_ascii_case("absent")))
        });

        Self {
            is_positive: !absent,
            is_never_found: absent,
            is_natural: true,
            is_not_rediscovered: false,
        }
    }

    /// Apply flags the provider states explicitly
    pub fn with_overrides(
        mut self,
        positive: Option<bool>,
        natural: Option<bool>,
        not_rediscovered: Option<bool>,
    ) -> Self {
        if let Some(positive) = positive {
            self.is_positive = positive;
            self.is_never_found = !positive;
        }
        if let Some(natural) = natural {
            self.is_natural = natural;
        }
        if let Some(not_rediscovered) = not_rediscovered {
            self.is_not_rediscovered = not_rediscovered;
        }
        self
    }
}
