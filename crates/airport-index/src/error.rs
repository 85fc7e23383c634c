//! Error types for the airport index crate.

use thiserror::Error;

/// Errors that can occur when loading data or querying the index.
///
/// Malformed records are not errors: they are reported through
/// [`BuildDiagnostics`](crate::BuildDiagnostics) and the build still succeeds.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O error reading a dataset or config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset is not valid JSON or is not a feature collection.
    #[error("GeoJSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// The config file is not valid YAML for [`IndexConfig`](crate::IndexConfig).
    #[error("config decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A config value is outside its allowed range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The caller passed arguments that no query can answer.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),
}

/// Caller errors for a single query.
///
/// These are distinct from an empty result: an empty index answers a valid
/// query with no matches, while a `QueryError` means the arguments were bad.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Nearest-neighbor queries need at least one result.
    #[error("k must be at least 1")]
    ZeroNeighbors,

    /// A coordinate argument was NaN or infinite.
    #[error("{name} is not finite: {value}")]
    NonFinite {
        /// Which argument was bad.
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Latitude outside [-90, 90].
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Longitude outside [-180, 180].
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    /// Bounding box with its southern edge north of its northern edge.
    #[error("min latitude {min_lat} is greater than max latitude {max_lat}")]
    InvertedLatitude {
        /// Southern edge.
        min_lat: f64,
        /// Northern edge.
        max_lat: f64,
    },

    /// Radius queries need a non-negative radius.
    #[error("radius {0} km is negative")]
    NegativeRadius(f64),
}
