//! Metrics emitted by the airport index.
//!
//! Metrics go through the `metrics` facade; nothing is recorded unless the
//! host installs a recorder. Call [`describe_metrics`] once at startup to
//! register descriptions.
//!
//! ```rust,ignore
//! airport_index::telemetry::describe_metrics();
//! let index = airport_index::AirportIndex::from_geojson_path("airports.geojson")?;
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Every metric the index records. All values are counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexMetric {
    /// Counter: features accepted into an index.
    RecordsAccepted,
    /// Counter, labelled `reason`: features rejected during ingestion.
    RecordsRejected,
    /// Counter: accepted records whose code is not usable as a key.
    RecordsLowConfidence,
    /// Gauge: occupied grid cells in the last built index.
    GridCellsOccupied,
    /// Counter, labelled `kind`: queries answered.
    Queries,
    /// Histogram: grid cells scanned per nearest or radius query.
    NearestCellsExamined,
}

impl IndexMetric {
    pub const ALL: [IndexMetric; 6] = [
        IndexMetric::RecordsAccepted,
        IndexMetric::RecordsRejected,
        IndexMetric::RecordsLowConfidence,
        IndexMetric::GridCellsOccupied,
        IndexMetric::Queries,
        IndexMetric::NearestCellsExamined,
    ];

    /// Name passed to the `metrics` macros.
    pub const fn name(self) -> &'static str {
        match self {
            IndexMetric::RecordsAccepted => "airport_index.records.accepted",
            IndexMetric::RecordsRejected => "airport_index.records.rejected",
            IndexMetric::RecordsLowConfidence => "airport_index.records.low_confidence",
            IndexMetric::GridCellsOccupied => "airport_index.grid.cells_occupied",
            IndexMetric::Queries => "airport_index.queries",
            IndexMetric::NearestCellsExamined => "airport_index.nearest.cells_examined",
        }
    }

    /// The label key this metric is split by, if any.
    pub const fn label(self) -> Option<&'static str> {
        match self {
            IndexMetric::RecordsRejected => Some("reason"),
            IndexMetric::Queries => Some("kind"),
            _ => None,
        }
    }

    fn description(self) -> &'static str {
        match self {
            IndexMetric::RecordsAccepted => "Features accepted into an index",
            IndexMetric::RecordsRejected => "Features rejected during ingestion, by reason",
            IndexMetric::RecordsLowConfidence => "Accepted records whose code is not usable as a key",
            IndexMetric::GridCellsOccupied => "Grid cells holding at least one record in the last built index",
            IndexMetric::Queries => "Queries answered, by query kind",
            IndexMetric::NearestCellsExamined => "Grid cells scanned per nearest-neighbor or radius query",
        }
    }

    fn describe(self) {
        let (name, description) = (self.name(), self.description());
        match self {
            IndexMetric::GridCellsOccupied => {
                describe_gauge!(name, Unit::Count, description);
            }
            IndexMetric::NearestCellsExamined => {
                describe_histogram!(name, Unit::Count, description);
            }
            _ => {
                describe_counter!(name, Unit::Count, description);
            }
        }
    }
}

/// Register descriptions for every [`IndexMetric`].
pub fn describe_metrics() {
    for metric in IndexMetric::ALL {
        metric.describe();
    }
}
