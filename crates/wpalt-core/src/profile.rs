//! Terrain profiles along a leg and the collaborator traits that produce them.

use crate::error::{PlanError, PlanResult};
use crate::models::GeoPoint;
use crate::spatial::haversine_distance;
use serde::{Deserialize, Serialize};

/// Elevation floor below which samples are treated as raster artifacts (Dead Sea is ~-413 m).
pub const DEFAULT_ANOMALY_FLOOR_M: f64 = -414.0;

/// Douglas-Peucker tolerance used for leg profiles.
pub const DEFAULT_SIMPLIFY_TOLERANCE_M: f64 = 50.0;

/// A dense terrain sample along a leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    pub lat: f64,
    pub lon: f64,
    /// `None` when the elevation source has no data for this position
    pub elevation_m: Option<f64>,
    /// Provider-reported distance from the line start. Informational only:
    /// the planner recomputes distances from coordinates in [`profile_metrics`].
    pub distance_from_origin_m: f64,
}

/// Distance/elevation pair used by the simplifier and the clearance solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub distance_m: f64,
    pub elevation_m: f64,
}

impl ProfilePoint {
    pub fn new(distance_m: f64, elevation_m: f64) -> Self {
        Self {
            distance_m,
            elevation_m,
        }
    }
}

/// Source of ground elevations.
///
/// Calls are synchronous from the planner's point of view; any fetching or
/// retry policy lives behind the implementation.
pub trait ElevationProvider {
    /// Ground elevation in meters at one coordinate.
    fn point_elevation(&self, lat: f64, lon: f64) -> PlanResult<f64>;

    /// Ordered samples along the straight line from `from` to `to`, with
    /// `distance_from_origin_m` populated relative to `from`.
    fn line_profile(&self, from: GeoPoint, to: GeoPoint) -> PlanResult<Vec<TerrainSample>>;
}

impl<T: ElevationProvider + ?Sized> ElevationProvider for &T {
    fn point_elevation(&self, lat: f64, lon: f64) -> PlanResult<f64> {
        (**self).point_elevation(lat, lon)
    }

    fn line_profile(&self, from: GeoPoint, to: GeoPoint) -> PlanResult<Vec<TerrainSample>> {
        (**self).line_profile(from, to)
    }
}

/// Reduces a dense profile to representative points within a tolerance.
pub trait ProfileSimplifier {
    /// Returns an ordered subsequence of `profile`.
    fn simplify(&self, profile: &[ProfilePoint], tolerance_m: f64) -> Vec<ProfilePoint>;
}

/// Drop samples at or below `floor_m`.
///
/// A sample without elevation is an error rather than a silent gap: an
/// unknown peak could hide under it.
pub fn filter_anomalies(samples: &[TerrainSample], floor_m: f64) -> PlanResult<Vec<TerrainSample>> {
    let mut kept = Vec::with_capacity(samples.len());
    for sample in samples {
        let elevation = match sample.elevation_m {
            Some(value) if value.is_finite() => value,
            _ => {
                return Err(PlanError::MissingElevationData {
                    lat: sample.lat,
                    lon: sample.lon,
                })
            }
        };
        if elevation > floor_m {
            kept.push(*sample);
        }
    }
    Ok(kept)
}

/// Recompute cumulative distance along `samples`, starting at `origin`.
///
/// Only coordinates are used; `distance_from_origin_m` is ignored so the
/// result is the same whatever distance model the provider applied. Callers
/// must pass samples whose elevations are known (see [`filter_anomalies`]).
pub fn profile_metrics(origin: GeoPoint, samples: &[TerrainSample]) -> Vec<ProfilePoint> {
    let mut points = Vec::with_capacity(samples.len());
    let mut prev = origin;
    let mut distance = 0.0;
    for sample in samples {
        distance += haversine_distance(prev.lat, prev.lon, sample.lat, sample.lon);
        prev = GeoPoint::new(sample.lat, sample.lon);
        points.push(ProfilePoint::new(distance, sample.elevation_m.unwrap_or(f64::NAN)));
    }
    points
}
