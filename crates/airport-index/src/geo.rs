//! Spherical geometry helpers: great-circle distance and lon/lat boxes.

use crate::QueryError;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6_371.0088;

/// Great-circle distance between two points using the haversine formula.
///
/// Arguments are in degrees, result in kilometres. Longitude differences
/// wrap naturally, so points either side of the antimeridian are close.
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Convert an angle in degrees to a surface distance in kilometres.
pub fn degrees_to_km(degrees: f64) -> f64 {
    degrees.to_radians() * EARTH_RADIUS_KM
}

/// Wrap a longitude that is at most one turn outside [-180, 180] back into range.
///
/// Returns `None` for values further out, which are treated as garbage rather
/// than as a longitude that went around the globe several times.
pub fn wrap_longitude(lon: f64) -> Option<f64> {
    if (-180.0..=180.0).contains(&lon) {
        Some(lon)
    } else if lon > 180.0 && lon <= 540.0 {
        Some(lon - 360.0)
    } else if (-540.0..-180.0).contains(&lon) {
        Some(lon + 360.0)
    } else {
        None
    }
}

/// Check that a query point is finite and on the globe.
pub(crate) fn check_point(lon: f64, lat: f64) -> Result<(), QueryError> {
    check_finite("longitude", lon)?;
    check_finite("latitude", lat)?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(QueryError::LatitudeOutOfRange(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(QueryError::LongitudeOutOfRange(lon));
    }
    Ok(())
}

fn check_finite(name: &'static str, value: f64) -> Result<(), QueryError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(QueryError::NonFinite { name, value })
    }
}

/// A lon/lat rectangle, possibly crossing the antimeridian.
///
/// By convention `min_lon > max_lon` means the box starts at `min_lon`, runs
/// east through ±180° and ends at `max_lon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, QueryError> {
        check_point(min_lon, min_lat)?;
        check_point(max_lon, max_lat)?;
        if min_lat > max_lat {
            return Err(QueryError::InvertedLatitude { min_lat, max_lat });
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// The whole globe.
    pub fn world() -> Self {
        Self {
            min_lon: -180.0,
            min_lat: -90.0,
            max_lon: 180.0,
            max_lat: 90.0,
        }
    }

    /// Whether the box wraps across ±180°.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Check if a coordinate is within the box (edges inclusive).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            lon >= self.min_lon && lon <= self.max_lon
        }
    }
}
