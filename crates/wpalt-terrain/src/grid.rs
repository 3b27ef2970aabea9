//! Regular lat/lon elevation grid with bilinear sampling.

use crate::error::TerrainError;
use serde::{Deserialize, Serialize};
use wpalt_core::spatial::{meters_per_deg_lat, meters_per_deg_lon};
use wpalt_core::GeoPoint;

/// Tolerance for points sitting on the grid edge after float round-off.
const EDGE_EPSILON_DEG: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl TerrainBounds {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat - EDGE_EPSILON_DEG
            && lat <= self.max_lat + EDGE_EPSILON_DEG
            && lon >= self.min_lon - EDGE_EPSILON_DEG
            && lon <= self.max_lon + EDGE_EPSILON_DEG
    }

    pub fn contains_bounds(&self, other: &TerrainBounds) -> bool {
        self.contains(other.min_lat, other.min_lon) && self.contains(other.max_lat, other.max_lon)
    }
}

/// Row-major grid; row 0 is `min_lat`, column 0 is `min_lon`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainGrid {
    bounds: TerrainBounds,
    lat_step_deg: f64,
    lon_step_deg: f64,
    rows: usize,
    cols: usize,
    /// `None` marks cells the provider had no data for
    elevations_m: Vec<Option<f64>>,
}

impl TerrainGrid {
    pub fn new(
        bounds: TerrainBounds,
        rows: usize,
        cols: usize,
        elevations_m: Vec<Option<f64>>,
    ) -> Result<Self, TerrainError> {
        if rows < 2 || cols < 2 {
            return Err(TerrainError::Config(format!(
                "terrain grid needs at least 2x2 cells, got {rows}x{cols}"
            )));
        }
        let expected = rows * cols;
        if elevations_m.len() != expected {
            return Err(TerrainError::GridShape {
                expected,
                actual: elevations_m.len(),
            });
        }
        Ok(Self {
            bounds,
            lat_step_deg: (bounds.max_lat - bounds.min_lat) / (rows - 1) as f64,
            lon_step_deg: (bounds.max_lon - bounds.min_lon) / (cols - 1) as f64,
            rows,
            cols,
            elevations_m,
        })
    }

    pub fn bounds(&self) -> &TerrainBounds {
        &self.bounds
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Node spacing in meters along the coarser axis, at the grid's mean latitude.
    pub fn spacing_m(&self) -> f64 {
        let mean_lat = (self.bounds.min_lat + self.bounds.max_lat) / 2.0;
        let lat_m = self.lat_step_deg * meters_per_deg_lat(mean_lat);
        let lon_m = self.lon_step_deg * meters_per_deg_lon(mean_lat);
        lat_m.max(lon_m)
    }

    /// Bilinear elevation, `None` outside the grid or next to a no-data cell.
    pub fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
        if !lat.is_finite() || !lon.is_finite() || !self.bounds.contains(lat, lon) {
            return None;
        }

        let lat_step = self.lat_step_deg.max(1e-12);
        let lon_step = self.lon_step_deg.max(1e-12);
        let max_y = (self.rows - 1) as f64;
        let max_x = (self.cols - 1) as f64;
        let y = ((lat - self.bounds.min_lat) / lat_step).clamp(0.0, max_y);
        let x = ((lon - self.bounds.min_lon) / lon_step).clamp(0.0, max_x);

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let dy = y - y0 as f64;
        let dx = x - x0 as f64;
        // Zero-weight neighbours are not read, so a point on a valid node
        // next to a no-data cell still samples.
        let y1 = if dy > 0.0 { (y0 + 1).min(self.rows - 1) } else { y0 };
        let x1 = if dx > 0.0 { (x0 + 1).min(self.cols - 1) } else { x0 };

        let v00 = self.value_at(y0, x0)?;
        let v10 = self.value_at(y0, x1)?;
        let v01 = self.value_at(y1, x0)?;
        let v11 = self.value_at(y1, x1)?;

        let v0 = v00 + (v10 - v00) * dx;
        let v1 = v01 + (v11 - v01) * dx;
        Some(v0 + (v1 - v0) * dy)
    }

    fn value_at(&self, row: usize, col: usize) -> Option<f64> {
        let idx = row.saturating_mul(self.cols) + col.min(self.cols - 1);
        self.elevations_m.get(idx).copied().flatten()
    }
}

pub fn bounds_from_points(points: &[GeoPoint]) -> Option<TerrainBounds> {
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut min_lon = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    for point in points {
        if !point.is_finite() {
            continue;
        }
        min_lat = min_lat.min(point.lat);
        max_lat = max_lat.max(point.lat);
        min_lon = min_lon.min(point.lon);
        max_lon = max_lon.max(point.lon);
    }
    if !min_lat.is_finite() || !min_lon.is_finite() {
        return None;
    }
    Some(TerrainBounds {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    })
}

pub fn expand_bounds(bounds: &TerrainBounds, pad_ratio: f64) -> TerrainBounds {
    let lat_span = bounds.max_lat - bounds.min_lat;
    let lon_span = bounds.max_lon - bounds.min_lon;
    let pad_lat = (lat_span * pad_ratio).max(0.0015);
    let pad_lon = (lon_span * pad_ratio).max(0.0015);
    TerrainBounds {
        min_lat: (bounds.min_lat - pad_lat).max(-90.0),
        max_lat: (bounds.max_lat + pad_lat).min(90.0),
        min_lon: bounds.min_lon - pad_lon,
        max_lon: bounds.max_lon + pad_lon,
    }
}

/// Upper bound on node spacing when coarsening a grid to its point budget.
const MAX_GRID_SPACING_M: f64 = 5000.0;

/// Grid shape chosen for a fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    pub rows: usize,
    pub cols: usize,
    /// Node spacing the grid was sized for; larger than requested when coarsened
    pub spacing_m: f64,
}

/// Grid rows/cols for `bounds`, coarsening the spacing until the grid fits `max_points`.
pub fn resolve_grid_dims(bounds: &TerrainBounds, spacing_m: f64, max_points: usize) -> GridPlan {
    let mean_lat = (bounds.min_lat + bounds.max_lat) / 2.0;
    let lat_m_per_deg = meters_per_deg_lat(mean_lat);
    let lon_m_per_deg = meters_per_deg_lon(mean_lat);
    let mut spacing = spacing_m.max(5.0).min(MAX_GRID_SPACING_M);
    let max_points = max_points.max(4);

    loop {
        let lat_step_deg = spacing / lat_m_per_deg;
        let lon_step_deg = spacing / lon_m_per_deg;
        let rows = ((bounds.max_lat - bounds.min_lat) / lat_step_deg).ceil().max(1.0) as usize + 1;
        let cols = ((bounds.max_lon - bounds.min_lon) / lon_step_deg).ceil().max(1.0) as usize + 1;
        let total = rows.saturating_mul(cols);
        if total <= max_points || spacing >= MAX_GRID_SPACING_M {
            if total > max_points {
                tracing::warn!(
                    "Terrain grid spacing capped at {:.0} m with {} points over the limit {}",
                    spacing,
                    total,
                    max_points
                );
            }
            return GridPlan {
                rows,
                cols,
                spacing_m: spacing,
            };
        }

        let scale = ((total as f64) / (max_points as f64)).sqrt().max(1.1);
        spacing = (spacing * scale).min(MAX_GRID_SPACING_M);
    }
}

/// Node coordinates of a grid over `bounds`, row-major.
pub fn grid_nodes(bounds: &TerrainBounds, rows: usize, cols: usize) -> Vec<GeoPoint> {
    let lat_step = (bounds.max_lat - bounds.min_lat) / (rows.max(2) - 1) as f64;
    let lon_step = (bounds.max_lon - bounds.min_lon) / (cols.max(2) - 1) as f64;
    let mut nodes = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let lat = bounds.min_lat + row as f64 * lat_step;
        for col in 0..cols {
            nodes.push(GeoPoint::new(lat, bounds.min_lon + col as f64 * lon_step));
        }
    }
    nodes
}
