//! Raw GeoJSON input shapes and the normalized airport record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One GeoJSON feature as it appears in the source dataset.
///
/// Every field is optional and coordinates are kept as loose JSON values:
/// the dataset has no schema, so shape problems are found during ingestion
/// and reported as rejections instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    /// Descriptive fields.
    #[serde(default)]
    pub properties: RawProperties,
    /// Point geometry.
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

/// The `properties` object of a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProperties {
    /// Airport code; sometimes a country name in the dirty dataset.
    #[serde(default)]
    pub iata: Option<String>,
    /// Facility name.
    #[serde(default)]
    pub name: Option<String>,
    /// City served.
    #[serde(default)]
    pub city: Option<String>,
    /// Country or territory.
    #[serde(default)]
    pub country: Option<String>,
}

/// The `geometry` object of a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGeometry {
    /// Geometry type, `"Point"` in well-formed records.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// `[lon, lat]` in well-formed records.
    #[serde(default)]
    pub coordinates: Vec<Value>,
}

impl RawFeature {
    /// Build a feature from typed values, mostly useful for fixtures.
    pub fn point(iata: &str, name: &str, city: &str, country: &str, lon: f64, lat: f64) -> Self {
        Self {
            properties: RawProperties {
                iata: Some(iata.to_string()),
                name: Some(name.to_string()),
                city: Some(city.to_string()),
                country: Some(country.to_string()),
            },
            geometry: Some(RawGeometry {
                kind: Some("Point".to_string()),
                coordinates: vec![Value::from(lon), Value::from(lat)],
            }),
        }
    }

    /// The coordinate entries as given, empty when there is no geometry.
    pub(crate) fn raw_coordinates(&self) -> &[Value] {
        self.geometry
            .as_ref()
            .map(|g| g.coordinates.as_slice())
            .unwrap_or_default()
    }
}

/// Read one coordinate entry as a number.
///
/// Numbers encoded as JSON strings (`"12.5"`) are accepted; the dataset is
/// hand-edited and both forms occur in similar files.
pub(crate) fn coordinate_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// How far an airport's code can be trusted as a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyConfidence {
    /// A 2–4 character ASCII alphanumeric code; present in the code table.
    High,
    /// Empty, oversized or otherwise malformed; spatial queries only.
    Low,
}

/// A validated airport.
///
/// Coordinates are always within [-180, 180] × [-90, 90].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    /// Uppercased, trimmed code. May be empty when `key_confidence` is `Low`.
    pub iata: String,
    /// Facility name.
    pub name: String,
    /// City served.
    pub city: String,
    /// Country or territory.
    pub country: String,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Whether `iata` is usable as a key.
    pub key_confidence: KeyConfidence,
    /// Position of the feature in the input list.
    pub source_position: usize,
}

impl AirportRecord {
    /// True when the record is reachable through code lookup.
    pub fn has_reliable_code(&self) -> bool {
        self.key_confidence == KeyConfidence::High
    }
}

/// Check whether a normalized code is a well-formed key.
pub(crate) fn is_well_formed_code(code: &str) -> bool {
    (2..=4).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
