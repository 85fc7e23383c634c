//! # airport-index
//!
//! Geospatial lookup index over a GeoJSON airport dataset, for globe and map
//! UIs: hover-to-nearest-airport, viewport culling, and code/city
//! autocomplete.
//!
//! ## Overview
//!
//! The dataset is a static `FeatureCollection` of airports, each with an IATA
//! code, name, city, country and a `[lon, lat]` point. It is hand-edited and
//! known to be dirty: some codes hold country names, some coordinates are
//! swapped or zeroed. The index therefore:
//!
//! 1. validates and normalizes every feature, rejecting or flagging bad ones
//!    without failing the build ([`BuildDiagnostics`] accounts for all of them),
//! 2. buckets accepted records into a uniform lon/lat grid (5°×5° by default),
//! 3. keeps ordered code and city tables for exact and prefix lookup.
//!
//! After [`AirportIndex::build`] returns, the index is immutable and can be
//! shared across threads freely.
//!
//! ## Queries
//!
//! - [`AirportIndex::find_nearest`]: k nearest by great-circle distance,
//!   correct across the antimeridian and near the poles
//! - [`AirportIndex::find_in_bounding_box`]: lazy, restartable viewport scan
//!   (`min_lon > max_lon` wraps through ±180°)
//! - [`AirportIndex::find_by_code`]: case-insensitive exact code
//! - [`AirportIndex::find_within_radius`], [`AirportIndex::find_by_city`],
//!   [`AirportIndex::autocomplete`]
//!
//! ## Example
//!
//! ```no_run
//! use airport_index::{AirportIndex, IndexConfig};
//!
//! let config = IndexConfig::from_yaml_path("airports.yaml")?;
//! let index = AirportIndex::from_geojson_path_with_config("airports.geojson", &config)?;
//! println!("{} airports, {} rejected", index.len(), index.diagnostics().rejected_count());
//!
//! for neighbor in index.find_nearest(-122.3321, 47.6062, 3)? {
//!     println!("{} {:.1} km", neighbor.record.iata, neighbor.distance_km);
//! }
//!
//! let visible = index.find_in_bounding_box(170.0, -50.0, -170.0, -30.0)?.count();
//! println!("{visible} airports straddling the antimeridian");
//! # Ok::<(), airport_index::IndexError>(())
//! ```

mod config;
mod error;
pub mod geo;
mod grid;
mod index;
mod ingest;
mod loader;
mod lookup;
mod record;
pub mod telemetry;

pub use config::{
    IndexConfig, KeyPolicy, DEFAULT_CELL_SIZE_DEG, DEFAULT_MAX_LOGGED_REJECTIONS, MIN_CELL_SIZE_DEG,
};
pub use error::{IndexError, QueryError};
pub use geo::{haversine_km, BoundingBox, EARTH_RADIUS_KM};
pub use index::{AirportIndex, BoundingBoxIter, Neighbor};
pub use ingest::{
    AppliedRepair, BuildDiagnostics, DuplicateCode, LowConfidenceKey, RejectReason, Rejection, Repair,
};
pub use record::{AirportRecord, KeyConfidence, RawFeature, RawGeometry, RawProperties};

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
