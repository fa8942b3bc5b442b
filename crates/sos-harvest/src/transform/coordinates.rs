//! Coordinate reference systems and derived geometry
//!
//! Grid systems are converted with the Gauss-Krüger inverse formulas
//! published by Lantmäteriet. RT90 uses the GRS80-based parameter set that
//! lands directly in SWEREF99, which is treated as equal to WGS84.

use geo::{HaversineDestination, LineString, Point, Polygon};
use std::f64::consts::PI;

/// Radius used for the uncertainty buffer when a record carries none
pub const DEFAULT_UNCERTAINTY_METERS: i32 = 5000;

/// Vertices of the buffer circle
const BUFFER_VERTICES: usize = 32;

const GRS80_A: f64 = 6_378_137.0;
const GRS80_F: f64 = 1.0 / 298.257_222_101;
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    Wgs84,
    Sweref99Tm,
    Rt90,
    WebMercator,
}

impl CoordinateSystem {
    /// Recognise a declared reference such as `EPSG:3006`, `SWEREF99 TM` or `WGS84`
    pub fn parse(declared: &str) -> Option<Self> {
        let normalized: String = declared
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_uppercase();

        let code = normalized
            .strip_prefix("URN:OGC:DEF:CRS:EPSG::")
            .or_else(|| normalized.strip_prefix("EPSG:"))
            .unwrap_or(&normalized);

        match code {
            // Geographic SWEREF99 and ETRS89 coincide with WGS84 at this precision
            "4326" | "WGS84" | "WGS1984" | "4619" | "SWEREF99" | "4258" | "ETRS89" => {
                Some(CoordinateSystem::Wgs84)
            }
            "3006" | "SWEREF99TM" => Some(CoordinateSystem::Sweref99Tm),
            "3021" | "RT90" | "RT902.5GONV" | "RT9025GONV" => Some(CoordinateSystem::Rt90),
            "3857" | "900913" | "WEBMERCATOR" | "PSEUDOMERCATOR" => {
                Some(CoordinateSystem::WebMercator)
            }
            _ => None,
        }
    }

    pub fn epsg(&self) -> i32 {
        match self {
            CoordinateSystem::Wgs84 => 4326,
            CoordinateSystem::Sweref99Tm => 3006,
            CoordinateSystem::Rt90 => 3021,
            CoordinateSystem::WebMercator => 3857,
        }
    }

    /// Convert `(x, y)` (easting/longitude, northing/latitude) to WGS84 `(lon, lat)`
    pub fn to_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            CoordinateSystem::Wgs84 => (x, y),
            CoordinateSystem::Sweref99Tm => GaussKruger::SWEREF99_TM.grid_to_geodetic(y, x),
            CoordinateSystem::Rt90 => GaussKruger::RT90_25_GON_V.grid_to_geodetic(y, x),
            CoordinateSystem::WebMercator => {
                let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
                let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
                (lon, lat)
            }
        }
    }
}

/// Transverse Mercator projection parameters
#[derive(Debug, Clone, Copy)]
struct GaussKruger {
    central_meridian: f64,
    scale: f64,
    false_northing: f64,
    false_easting: f64,
}

impl GaussKruger {
    const SWEREF99_TM: GaussKruger = GaussKruger {
        central_meridian: 15.0,
        scale: 0.9996,
        false_northing: 0.0,
        false_easting: 500_000.0,
    };

    const RT90_25_GON_V: GaussKruger = GaussKruger {
        central_meridian: 15.0 + 48.0 / 60.0 + 22.624306 / 3600.0,
        scale: 1.000_005_610_24,
        false_northing: -667.711,
        false_easting: 1_500_064.274,
    };

    fn grid_to_geodetic(&self, northing: f64, easting: f64) -> (f64, f64) {
        let e2 = GRS80_F * (2.0 - GRS80_F);
        let n = GRS80_F / (2.0 - GRS80_F);
        let a_roof = GRS80_A / (1.0 + n) * (1.0 + n.powi(2) / 4.0 + n.powi(4) / 64.0);

        let delta1 = n / 2.0 - 2.0 * n.powi(2) / 3.0 + 37.0 * n.powi(3) / 96.0 - n.powi(4) / 360.0;
        let delta2 = n.powi(2) / 48.0 + n.powi(3) / 15.0 - 437.0 * n.powi(4) / 1440.0;
        let delta3 = 17.0 * n.powi(3) / 480.0 - 37.0 * n.powi(4) / 840.0;
        let delta4 = 4397.0 * n.powi(4) / 161_280.0;

        let a_star = e2 + e2.powi(2) + e2.powi(3) + e2.powi(4);
        let b_star = -(7.0 * e2.powi(2) + 17.0 * e2.powi(3) + 30.0 * e2.powi(4)) / 6.0;
        let c_star = (224.0 * e2.powi(3) + 889.0 * e2.powi(4)) / 120.0;
        let d_star = -(4279.0 * e2.powi(4)) / 1260.0;

        let xi = (northing - self.false_northing) / (self.scale * a_roof);
        let eta = (easting - self.false_easting) / (self.scale * a_roof);

        let deltas = [delta1, delta2, delta3, delta4];
        let (mut xi_prim, mut eta_prim) = (xi, eta);
        for (i, delta) in deltas.iter().enumerate() {
            let k = 2.0 * (i as f64 + 1.0);
            xi_prim -= delta * (k * xi).sin() * (k * eta).cosh();
            eta_prim -= delta * (k * xi).cos() * (k * eta).sinh();
        }

        let phi_star = (xi_prim.sin() / eta_prim.cosh()).asin();
        let delta_lambda = (eta_prim.sinh() / xi_prim.cos()).atan();

        let sin_phi = phi_star.sin();
        let lat = phi_star
            + sin_phi
                * phi_star.cos()
                * (a_star
                    + b_star * sin_phi.powi(2)
                    + c_star * sin_phi.powi(4)
                    + d_star * sin_phi.powi(6));
        let lon = self.central_meridian.to_radians() + delta_lambda;

        (lon.to_degrees(), lat.to_degrees())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Unrecognised spatial reference: {0}")]
    UnknownSystem(String),

    #[error("Coordinate ({lon}, {lat}) is outside WGS84 bounds")]
    OutOfRange { lon: f64, lat: f64 },
}

/// Normalize a point in the declared reference to WGS84
///
/// A missing or blank declaration means the point is already WGS84.
pub fn normalize(x: f64, y: f64, declared: Option<&str>) -> Result<(f64, f64), CoordinateError> {
    let system = match declared.map(str::trim).filter(|d| !d.is_empty()) {
        None => CoordinateSystem::Wgs84,
        Some(text) => CoordinateSystem::parse(text)
            .ok_or_else(|| CoordinateError::UnknownSystem(text.to_string()))?,
    };

    let (lon, lat) = system.to_wgs84(x, y);
    if !lon.is_finite() || !lat.is_finite() || !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat)
    {
        return Err(CoordinateError::OutOfRange { lon, lat });
    }
    Ok((lon, lat))
}

/// Circle of `radius_meters` around a WGS84 point
pub fn point_with_buffer(lon: f64, lat: f64, radius_meters: f64) -> Polygon<f64> {
    let center = Point::new(lon, lat);
    let ring: Vec<_> = (0..BUFFER_VERTICES)
        .map(|i| {
            let bearing = 360.0 * i as f64 / BUFFER_VERTICES as f64;
            center.haversine_destination(bearing, radius_meters).0
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use geo::Contains;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_parse_declared_systems() {
        assert_eq!(CoordinateSystem::parse("EPSG:3006"), Some(CoordinateSystem::Sweref99Tm));
        assert_eq!(CoordinateSystem::parse("SWEREF99 TM"), Some(CoordinateSystem::Sweref99Tm));
        assert_eq!(CoordinateSystem::parse("wgs 84"), Some(CoordinateSystem::Wgs84));
        assert_eq!(CoordinateSystem::parse("RT90 2.5 gon V"), Some(CoordinateSystem::Rt90));
        assert_eq!(CoordinateSystem::parse("urn:ogc:def:crs:EPSG::3857"), Some(CoordinateSystem::WebMercator));
        assert_eq!(CoordinateSystem::parse("EPSG:31467"), None);
        assert_eq!(CoordinateSystem::Rt90.epsg(), 3021);
    }

    #[test]
    fn test_sweref99_central_meridian() {
        let (lon, lat) = CoordinateSystem::Sweref99Tm.to_wgs84(500_000.0, 6_500_000.0);
        assert!(close(lon, 15.0, 1e-9));
        assert!(close(lat, 58.6403, 1e-4));
    }

    #[test]
    fn test_rt90_and_sweref99_agree_for_stockholm() {
        let sweref = CoordinateSystem::Sweref99Tm.to_wgs84(674_032.0, 6_580_822.0);
        let rt90 = CoordinateSystem::Rt90.to_wgs84(1_628_294.0, 6_580_994.0);
        assert!(close(sweref.0, 18.0592, 1e-3) && close(sweref.1, 59.3302, 1e-3));
        assert!(close(sweref.0, rt90.0, 1e-4) && close(sweref.1, rt90.1, 1e-4));
    }

    #[test]
    fn test_web_mercator_inverse() {
        let (lon, lat) = CoordinateSystem::WebMercator.to_wgs84(0.0, 0.0);
        assert!(close(lon, 0.0, 1e-12) && close(lat, 0.0, 1e-12));
    }

    #[test]
    fn test_normalize_rejects_unknown_and_out_of_range() {
        assert_eq!(normalize(16.0, 58.0, None).unwrap(), (16.0, 58.0));
        assert!(matches!(
            normalize(1.0, 2.0, Some("EPSG:2400")),
            Err(CoordinateError::UnknownSystem(_))
        ));
        assert!(matches!(
            normalize(200.0, 58.0, Some("  ")),
            Err(CoordinateError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_buffer_contains_center() {
        let buffer = point_with_buffer(16.0, 58.0, 100.0);
        assert_eq!(buffer.exterior().0.len(), BUFFER_VERTICES + 1);
        assert!(buffer.contains(&Point::new(16.0, 58.0)));
        assert!(!buffer.contains(&Point::new(16.01, 58.0)));
    }
}
