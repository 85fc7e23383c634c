//! Uniform lon/lat grid over the globe.
//!
//! Cells are stored in compressed form: one offset table plus a single flat
//! list of record ids ordered by cell. The data is static after build, so
//! there is no need for per-cell vectors.
//!
//! Rings are measured in cell steps from the query cell. Columns wrap around
//! the antimeridian and each cell belongs to exactly one ring, so a ring scan
//! never visits a cell twice. Rows are clamped at the poles.

use crate::geo::{degrees_to_km, BoundingBox};

/// Slack subtracted from distance bounds so rounding never hides a candidate.
const BOUND_TOLERANCE_KM: f64 = 1e-6;

#[derive(Debug)]
pub(crate) struct Grid {
    cols: usize,
    rows: usize,
    /// Effective cell width in degrees of longitude.
    cell_lon: f64,
    /// Effective cell height in degrees of latitude.
    cell_lat: f64,
    /// `offsets[cell]..offsets[cell + 1]` indexes into `entries`.
    offsets: Vec<u32>,
    entries: Vec<u32>,
}

impl Grid {
    /// Build a grid over points given as `(lon, lat)`, in id order.
    pub(crate) fn build(cell_size_deg: f64, points: &[(f64, f64)]) -> Self {
        let cols = ((360.0 / cell_size_deg).ceil() as usize).max(1);
        let rows = ((180.0 / cell_size_deg).ceil() as usize).max(1);
        let mut grid = Self {
            cols,
            rows,
            cell_lon: 360.0 / cols as f64,
            cell_lat: 180.0 / rows as f64,
            offsets: Vec::new(),
            entries: Vec::new(),
        };

        let cell_ids: Vec<usize> = points
            .iter()
            .map(|&(lon, lat)| {
                let (row, col) = grid.cell_of(lon, lat);
                grid.cell_id(row, col)
            })
            .collect();

        // Counting sort keeps ids in ascending order within each cell.
        let mut offsets = vec![0u32; cols * rows + 1];
        for &cell in &cell_ids {
            offsets[cell + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }
        let mut cursor = offsets.clone();
        let mut entries = vec![0u32; points.len()];
        for (id, &cell) in cell_ids.iter().enumerate() {
            entries[cursor[cell] as usize] = id as u32;
            cursor[cell] += 1;
        }

        grid.offsets = offsets;
        grid.entries = entries;
        grid
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    pub(crate) fn occupied_cell_count(&self) -> usize {
        self.offsets.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// Effective `(lon, lat)` cell size in degrees.
    pub(crate) fn cell_size(&self) -> (f64, f64) {
        (self.cell_lon, self.cell_lat)
    }

    /// Row and column of the cell containing a point. Points on the east and
    /// north edges of the globe fall in the last column and row.
    pub(crate) fn cell_of(&self, lon: f64, lat: f64) -> (usize, usize) {
        let col = ((lon + 180.0) / self.cell_lon).floor().max(0.0) as usize;
        let row = ((lat + 90.0) / self.cell_lat).floor().max(0.0) as usize;
        (row.min(self.rows - 1), col.min(self.cols - 1))
    }

    fn cell_id(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Record ids stored in a cell.
    pub(crate) fn cell_entries(&self, cell: usize) -> &[u32] {
        let start = self.offsets[cell] as usize;
        let end = self.offsets[cell + 1] as usize;
        &self.entries[start..end]
    }

    /// Largest ring index that can still contain unvisited cells.
    pub(crate) fn max_ring(&self) -> usize {
        (self.rows - 1).max(self.cols / 2)
    }

    /// Cells exactly `ring` steps from `(row, col)`.
    pub(crate) fn ring_cells(&self, row: usize, col: usize, ring: usize) -> Vec<usize> {
        if ring == 0 {
            return vec![self.cell_id(row, col)];
        }

        let full_cols = self.wrapped_cols_within(col, ring);
        let edge_cols = self.wrapped_cols_at(col, ring);
        let mut cells = Vec::new();

        let first_row = row.saturating_sub(ring);
        let last_row = (row + ring).min(self.rows - 1);
        for r in first_row..=last_row {
            let cols = if r.abs_diff(row) == ring {
                &full_cols
            } else {
                &edge_cols
            };
            cells.extend(cols.iter().map(|&c| self.cell_id(r, c)));
        }
        cells
    }

    /// Columns whose wrapped distance from `col` is at most `ring`.
    fn wrapped_cols_within(&self, col: usize, ring: usize) -> Vec<usize> {
        if 2 * ring + 1 >= self.cols {
            return (0..self.cols).collect();
        }
        (0..=2 * ring)
            .map(|offset| (col + self.cols + offset - ring) % self.cols)
            .collect()
    }

    /// Columns whose wrapped distance from `col` is exactly `ring`.
    fn wrapped_cols_at(&self, col: usize, ring: usize) -> Vec<usize> {
        if 2 * ring > self.cols {
            return Vec::new();
        }
        let east = (col + ring) % self.cols;
        let west = (col + self.cols - ring % self.cols) % self.cols;
        if east == west {
            vec![east]
        } else {
            vec![west, east]
        }
    }

    /// Lower bound in km on the distance from `(lon, lat)` to any point in a
    /// cell more than `ring` steps from `(row, col)`, the query's own cell.
    ///
    /// Such a point lies either outside the examined latitude band or at
    /// least the examined longitude half-width away in longitude.
    pub(crate) fn unexamined_bound_km(&self, lon: f64, lat: f64, row: usize, col: usize, ring: usize) -> f64 {
        let mut bound_deg = f64::INFINITY;

        if row > ring {
            let south_edge = (row - ring) as f64 * self.cell_lat - 90.0;
            bound_deg = bound_deg.min(lat - south_edge);
        }
        if row + ring < self.rows - 1 {
            let north_edge = (row + ring + 1) as f64 * self.cell_lat - 90.0;
            bound_deg = bound_deg.min(north_edge - lat);
        }

        if 2 * ring + 1 < self.cols {
            let west_edge = (col as f64 - ring as f64) * self.cell_lon - 180.0;
            let east_edge = (col + ring + 1) as f64 * self.cell_lon - 180.0;
            let delta_lon = (lon - west_edge).min(east_edge - lon).max(0.0);
            bound_deg = bound_deg.min(meridian_distance_deg(lat, delta_lon));
        }

        if bound_deg.is_infinite() {
            return f64::INFINITY;
        }
        (degrees_to_km(bound_deg.max(0.0)) - BOUND_TOLERANCE_KM).max(0.0)
    }

    /// Cells overlapping a bounding box, row by row from the south.
    pub(crate) fn cells_in_box(&self, bbox: &BoundingBox) -> Vec<usize> {
        let (first_row, west_col) = self.cell_of(bbox.min_lon, bbox.min_lat);
        let (last_row, east_col) = self.cell_of(bbox.max_lon, bbox.max_lat);

        let cols: Vec<usize> = if !bbox.crosses_antimeridian() {
            (west_col..=east_col).collect()
        } else if east_col >= west_col {
            // The two halves meet in the same column: every column is covered.
            (0..self.cols).collect()
        } else {
            (west_col..self.cols).chain(0..=east_col).collect()
        };

        let mut cells = Vec::with_capacity((last_row - first_row + 1) * cols.len());
        for row in first_row..=last_row {
            cells.extend(cols.iter().map(|&c| self.cell_id(row, c)));
        }
        cells
    }
}

/// Smallest angular distance in degrees from a point at latitude `lat` to
/// any point at least `delta_lon` degrees away in longitude.
///
/// Up to 90° this is the distance to the nearest boundary meridian; beyond
/// that the closest such point is the pole.
fn meridian_distance_deg(lat: f64, delta_lon: f64) -> f64 {
    if delta_lon >= 90.0 {
        90.0 - lat.abs()
    } else {
        let s = lat.to_radians().cos() * delta_lon.to_radians().sin();
        s.clamp(-1.0, 1.0).asin().to_degrees()
    }
}
