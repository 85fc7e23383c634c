//! The airport index: build once, query many times.

use crate::config::IndexConfig;
use crate::geo::{check_point, haversine_km, BoundingBox};
use crate::grid::Grid;
use crate::ingest::{BuildDiagnostics, Ingestor};
use crate::lookup::TextIndex;
use crate::record::{AirportRecord, RawFeature};
use crate::telemetry::IndexMetric;
use crate::{QueryError, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter::FusedIterator;

/// One nearest-neighbor result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    /// The matched airport.
    pub record: &'a AirportRecord,
    /// Great-circle distance from the query point.
    pub distance_km: f64,
}

/// Input to the shared build path: a deserialized feature, or the reason it
/// could not be deserialized.
pub(crate) enum FeatureEntry<'f> {
    Parsed(&'f RawFeature),
    Unparseable(String),
}

/// Immutable geospatial index over airport records.
///
/// Built once from the full record list, then answers nearest-neighbor,
/// bounding-box, radius, code and city queries. There are no mutating
/// methods, so an index can be shared across threads (`Arc<AirportIndex>`)
/// without locking.
///
/// # Example
///
/// ```
/// use airport_index::{AirportIndex, RawFeature};
///
/// let index = AirportIndex::build(&[
///     RawFeature::point("LHR", "Heathrow", "London", "United Kingdom", -0.4614, 51.4775),
///     RawFeature::point("CDG", "Charles de Gaulle", "Paris", "France", 2.5479, 49.0097),
/// ]);
///
/// let nearest = index.find_nearest(-0.1276, 51.5072, 1)?;
/// assert_eq!(nearest[0].record.iata, "LHR");
/// assert!(index.find_by_code("cdg").is_some());
/// # Ok::<(), airport_index::IndexError>(())
/// ```
#[derive(Debug)]
pub struct AirportIndex {
    records: Vec<AirportRecord>,
    grid: Grid,
    text: TextIndex,
    diagnostics: BuildDiagnostics,
    config: IndexConfig,
}

impl AirportIndex {
    /// Build an index with the default config.
    ///
    /// Malformed features are excluded and reported in
    /// [`diagnostics`](Self::diagnostics); they never fail the build.
    pub fn build(features: &[RawFeature]) -> Self {
        Self::assemble(features.iter().map(FeatureEntry::Parsed), IndexConfig::default())
    }

    /// Build an index with an explicit config.
    ///
    /// Fails only if the config itself is invalid.
    pub fn build_with_config(features: &[RawFeature], config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(features.iter().map(FeatureEntry::Parsed), config.clone()))
    }

    pub(crate) fn assemble<'f>(entries: impl Iterator<Item = FeatureEntry<'f>>, config: IndexConfig) -> Self {
        let mut ingestor = Ingestor::new(&config);
        let mut records = Vec::new();

        for (position, entry) in entries.enumerate() {
            match entry {
                FeatureEntry::Parsed(feature) => {
                    if let Some(record) = ingestor.ingest(position, feature) {
                        records.push(record);
                    }
                }
                FeatureEntry::Unparseable(message) => ingestor.reject_unparseable(position, message),
            }
        }

        let text = TextIndex::build(&records, ingestor.diagnostics_mut());
        let points: Vec<(f64, f64)> = records.iter().map(|r| (r.longitude, r.latitude)).collect();
        let grid = Grid::build(config.cell_size_deg, &points);
        let diagnostics = ingestor.finish(records.len());

        record_build_metrics(&diagnostics, &grid);
        tracing::info!(
            input = diagnostics.input_count,
            accepted = diagnostics.accepted_count,
            rejected = diagnostics.rejected_count(),
            low_confidence = diagnostics.low_confidence.len(),
            duplicate_codes = diagnostics.duplicate_codes.len(),
            codes = text.code_count(),
            cells = grid.cell_count(),
            cells_occupied = grid.occupied_cell_count(),
            "Built airport index"
        );

        Self {
            records,
            grid,
            text,
            diagnostics,
            config,
        }
    }

    /// The `k` records closest to a point, ascending by great-circle distance.
    ///
    /// Equal distances are ordered by code, then by input position, so the
    /// result is reproducible. Returns an empty list for an empty index and
    /// fewer than `k` results when the index is smaller than `k`.
    ///
    /// # Errors
    ///
    /// [`QueryError::ZeroNeighbors`] for `k == 0`, and a coordinate error for
    /// non-finite or out-of-range query points.
    pub fn find_nearest(&self, lon: f64, lat: f64, k: usize) -> Result<Vec<Neighbor<'_>>> {
        if k == 0 {
            return Err(QueryError::ZeroNeighbors.into());
        }
        check_point(lon, lat)?;
        metrics::counter!(IndexMetric::Queries.name(), "kind" => "nearest").increment(1);

        let mut found = self.scan_rings(lon, lat, f64::INFINITY, |found, bound_km| {
            if found.len() < k {
                return false;
            }
            self.rank(found);
            found.truncate(k);
            found[k - 1].0 < bound_km
        });
        self.rank(&mut found);
        found.truncate(k);

        Ok(self.to_neighbors(found))
    }

    /// All records within `radius_km` of a point, ascending by distance with
    /// the same tie-break as [`find_nearest`](Self::find_nearest).
    pub fn find_within_radius(&self, lon: f64, lat: f64, radius_km: f64) -> Result<Vec<Neighbor<'_>>> {
        check_point(lon, lat)?;
        if !radius_km.is_finite() {
            return Err(QueryError::NonFinite {
                name: "radius",
                value: radius_km,
            }
            .into());
        }
        if radius_km < 0.0 {
            return Err(QueryError::NegativeRadius(radius_km).into());
        }
        metrics::counter!(IndexMetric::Queries.name(), "kind" => "radius").increment(1);

        let mut found = self.scan_rings(lon, lat, radius_km, |_, bound_km| bound_km > radius_km);
        self.rank(&mut found);

        Ok(self.to_neighbors(found))
    }

    /// Look up a record by code, ignoring case and surrounding whitespace.
    ///
    /// `None` is the normal not-found outcome. Records with low-confidence
    /// codes are never returned here.
    pub fn find_by_code(&self, iata: &str) -> Option<&AirportRecord> {
        metrics::counter!(IndexMetric::Queries.name(), "kind" => "code").increment(1);
        self.text.code(iata).map(|id| &self.records[id as usize])
    }

    /// Records whose city matches exactly, ignoring case, in input order.
    pub fn find_by_city(&self, city: &str) -> Vec<&AirportRecord> {
        metrics::counter!(IndexMetric::Queries.name(), "kind" => "city").increment(1);
        self.text
            .city(city)
            .iter()
            .map(|&id| &self.records[id as usize])
            .collect()
    }

    /// Suggestions for a partially typed code or city.
    ///
    /// Code-prefix matches come first, ordered by code, followed by
    /// city-prefix matches ordered by city, then code. A record appears at
    /// most once. An empty or blank prefix suggests nothing.
    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<&AirportRecord> {
        metrics::counter!(IndexMetric::Queries.name(), "kind" => "autocomplete").increment(1);
        if prefix.trim().is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for id in self.text.codes_with_prefix(prefix) {
            if out.len() == limit {
                return out;
            }
            if seen.insert(id) {
                out.push(&self.records[id as usize]);
            }
        }

        for ids in self.text.cities_with_prefix(prefix) {
            let mut group: Vec<u32> = ids.iter().copied().filter(|id| !seen.contains(id)).collect();
            group.sort_by(|a, b| {
                self.records[*a as usize]
                    .iata
                    .cmp(&self.records[*b as usize].iata)
                    .then(a.cmp(b))
            });
            for id in group {
                if out.len() == limit {
                    return out;
                }
                seen.insert(id);
                out.push(&self.records[id as usize]);
            }
        }

        out
    }

    /// Lazily iterate over records inside a lon/lat box.
    ///
    /// `min_lon > max_lon` selects a box that crosses the antimeridian. The
    /// returned iterator only visits grid cells overlapping the box; clone it
    /// to restart, or call again for the same sequence.
    ///
    /// # Errors
    ///
    /// Non-finite or out-of-range bounds, or `min_lat > max_lat`.
    pub fn find_in_bounding_box(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Result<BoundingBoxIter<'_>> {
        let bbox = BoundingBox::new(min_lon, min_lat, max_lon, max_lat)?;
        Ok(self.find_in_box(&bbox))
    }

    /// Like [`find_in_bounding_box`](Self::find_in_bounding_box) for an
    /// already validated box.
    pub fn find_in_box(&self, bbox: &BoundingBox) -> BoundingBoxIter<'_> {
        metrics::counter!(IndexMetric::Queries.name(), "kind" => "bbox").increment(1);
        BoundingBoxIter {
            index: self,
            bbox: *bbox,
            cells: self.grid.cells_in_box(bbox),
            next_cell: 0,
            pending: &[],
        }
    }

    /// Number of records in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records in input order.
    pub fn iter(&self) -> impl Iterator<Item = &AirportRecord> {
        self.records.iter()
    }

    /// The `n`th accepted record.
    pub fn get(&self, n: usize) -> Option<&AirportRecord> {
        self.records.get(n)
    }

    /// What the build accepted, rejected, flagged and repaired.
    pub fn diagnostics(&self) -> &BuildDiagnostics {
        &self.diagnostics
    }

    /// The config the index was built with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Effective `(lon, lat)` grid cell size in degrees.
    pub fn cell_size(&self) -> (f64, f64) {
        self.grid.cell_size()
    }

    /// Expand rings around the query cell, collecting `(distance, id)` for
    /// records within `max_distance_km`, until `should_stop` accepts the
    /// lower bound for the unexamined cells or every cell has been seen.
    fn scan_rings<F>(&self, lon: f64, lat: f64, max_distance_km: f64, mut should_stop: F) -> Vec<(f64, u32)>
    where
        F: FnMut(&mut Vec<(f64, u32)>, f64) -> bool,
    {
        let mut found = Vec::new();
        if self.records.is_empty() {
            return found;
        }

        let (row, col) = self.grid.cell_of(lon, lat);
        let mut cells_examined = 0usize;

        for ring in 0..=self.grid.max_ring() {
            for cell in self.grid.ring_cells(row, col, ring) {
                cells_examined += 1;
                for &id in self.grid.cell_entries(cell) {
                    let record = &self.records[id as usize];
                    let distance = haversine_km(lon, lat, record.longitude, record.latitude);
                    if distance <= max_distance_km {
                        found.push((distance, id));
                    }
                }
            }

            let bound_km = self.grid.unexamined_bound_km(lon, lat, row, col, ring);
            if should_stop(&mut found, bound_km) {
                break;
            }
        }

        metrics::histogram!(IndexMetric::NearestCellsExamined.name()).record(cells_examined as f64);
        found
    }

    /// Sort candidates by distance, then code, then input position.
    fn rank(&self, candidates: &mut [(f64, u32)]) {
        candidates.sort_by(|a, b| self.compare_candidates(a, b));
    }

    fn compare_candidates(&self, a: &(f64, u32), b: &(f64, u32)) -> Ordering {
        a.0.total_cmp(&b.0)
            .then_with(|| {
                self.records[a.1 as usize]
                    .iata
                    .cmp(&self.records[b.1 as usize].iata)
            })
            .then(a.1.cmp(&b.1))
    }

    fn to_neighbors(&self, found: Vec<(f64, u32)>) -> Vec<Neighbor<'_>> {
        found
            .into_iter()
            .map(|(distance_km, id)| Neighbor {
                record: &self.records[id as usize],
                distance_km,
            })
            .collect()
    }
}

fn record_build_metrics(diagnostics: &BuildDiagnostics, grid: &Grid) {
    metrics::counter!(IndexMetric::RecordsAccepted.name()).increment(diagnostics.accepted_count as u64);
    for (reason, count) in diagnostics.rejections_by_reason() {
        metrics::counter!(IndexMetric::RecordsRejected.name(), "reason" => reason).increment(count as u64);
    }
    metrics::counter!(IndexMetric::RecordsLowConfidence.name()).increment(diagnostics.low_confidence.len() as u64);
    metrics::gauge!(IndexMetric::GridCellsOccupied.name()).set(grid.occupied_cell_count() as f64);
}

/// Lazy iterator over the records inside a bounding box.
///
/// Yields records cell by cell from the south-west, in input order within a
/// cell. Cloning gives an independent iterator from the same position.
#[derive(Debug, Clone)]
pub struct BoundingBoxIter<'a> {
    index: &'a AirportIndex,
    bbox: BoundingBox,
    cells: Vec<usize>,
    next_cell: usize,
    pending: &'a [u32],
}

impl<'a> BoundingBoxIter<'a> {
    /// The box being scanned.
    pub fn bounds(&self) -> BoundingBox {
        self.bbox
    }
}

impl<'a> Iterator for BoundingBoxIter<'a> {
    type Item = &'a AirportRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((&id, rest)) = self.pending.split_first() {
                self.pending = rest;
                let record = &self.index.records[id as usize];
                if self.bbox.contains(record.longitude, record.latitude) {
                    return Some(record);
                }
                continue;
            }

            let cell = *self.cells.get(self.next_cell)?;
            self.next_cell += 1;
            self.pending = self.index.grid.cell_entries(cell);
        }
    }
}

impl FusedIterator for BoundingBoxIter<'_> {}
