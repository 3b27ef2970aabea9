//! Elevation providers over fetched terrain: a regular grid, or elevations
//! sampled directly along each leg of a route.

use crate::error::TerrainError;
use crate::grid::TerrainGrid;
use std::collections::{HashMap, HashSet};
use wpalt_core::spatial::{distance_between, interpolate};
use wpalt_core::{ElevationProvider, GeoPoint, PlanError, PlanResult, TerrainSample};

fn effective_spacing(sample_spacing_m: f64) -> f64 {
    if sample_spacing_m.is_finite() {
        sample_spacing_m.max(1.0)
    } else {
        30.0
    }
}

/// Points every `spacing_m` meters from `from` to `to`, both endpoints included.
fn line_points(from: GeoPoint, to: GeoPoint, spacing_m: f64) -> Vec<GeoPoint> {
    let length = distance_between(from, to);
    let steps = ((length / spacing_m).ceil() as usize).max(1);
    (0..=steps)
        .map(|i| interpolate(from, to, i as f64 / steps as f64))
        .collect()
}

fn profile_from<F>(from: GeoPoint, to: GeoPoint, spacing_m: f64, elevation: F) -> Vec<TerrainSample>
where
    F: Fn(GeoPoint) -> Option<f64>,
{
    line_points(from, to, spacing_m)
        .into_iter()
        .map(|point| TerrainSample {
            lat: point.lat,
            lon: point.lon,
            elevation_m: elevation(point),
            distance_from_origin_m: distance_between(from, point),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct GridElevationProvider {
    grid: TerrainGrid,
    sample_spacing_m: f64,
}

impl GridElevationProvider {
    pub fn new(grid: TerrainGrid, sample_spacing_m: f64) -> Self {
        Self {
            grid,
            sample_spacing_m: effective_spacing(sample_spacing_m),
        }
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    pub fn sample_spacing_m(&self) -> f64 {
        self.sample_spacing_m
    }
}

impl ElevationProvider for GridElevationProvider {
    fn point_elevation(&self, lat: f64, lon: f64) -> PlanResult<f64> {
        self.grid
            .sample(lat, lon)
            .ok_or(PlanError::MissingElevationData { lat, lon })
    }

    /// Samples every `sample_spacing_m` meters; both endpoints are always included.
    fn line_profile(&self, from: GeoPoint, to: GeoPoint) -> PlanResult<Vec<TerrainSample>> {
        Ok(profile_from(from, to, self.sample_spacing_m, |p| {
            self.grid.sample(p.lat, p.lon)
        }))
    }
}

type PointKey = (u64, u64);

fn point_key(point: GeoPoint) -> PointKey {
    (point.lat.to_bits(), point.lon.to_bits())
}

/// Elevations fetched point by point along the legs of one route.
///
/// Legs are re-sampled with the same spacing on lookup, so every sample
/// position matches a fetched point exactly. Positions that were never
/// fetched come back without elevation.
#[derive(Debug, Clone)]
pub struct RouteProfiles {
    sample_spacing_m: f64,
    elevations: HashMap<PointKey, Option<f64>>,
}

impl RouteProfiles {
    /// Unique points to fetch for `route`: every waypoint and every leg sample.
    pub fn sample_points(route: &[GeoPoint], sample_spacing_m: f64) -> Vec<GeoPoint> {
        let spacing = effective_spacing(sample_spacing_m);
        let mut seen = HashSet::new();
        let mut points = Vec::new();
        let mut push = |point: GeoPoint| {
            if seen.insert(point_key(point)) {
                points.push(point);
            }
        };
        route.iter().copied().for_each(&mut push);
        for pair in route.windows(2) {
            line_points(pair[0], pair[1], spacing).into_iter().for_each(&mut push);
        }
        points
    }

    pub fn from_elevations(
        sample_spacing_m: f64,
        points: &[GeoPoint],
        elevations: Vec<Option<f64>>,
    ) -> Result<Self, TerrainError> {
        if points.len() != elevations.len() {
            return Err(TerrainError::SampleCount {
                expected: points.len(),
                actual: elevations.len(),
            });
        }
        let elevations = points
            .iter()
            .zip(elevations)
            .map(|(point, elevation)| (point_key(*point), elevation.filter(|v| v.is_finite())))
            .collect();
        Ok(Self {
            sample_spacing_m: effective_spacing(sample_spacing_m),
            elevations,
        })
    }

    pub fn sample_spacing_m(&self) -> f64 {
        self.sample_spacing_m
    }

    fn lookup(&self, point: GeoPoint) -> Option<f64> {
        self.elevations.get(&point_key(point)).copied().flatten()
    }
}

impl ElevationProvider for RouteProfiles {
    fn point_elevation(&self, lat: f64, lon: f64) -> PlanResult<f64> {
        self.lookup(GeoPoint::new(lat, lon))
            .ok_or(PlanError::MissingElevationData { lat, lon })
    }

    fn line_profile(&self, from: GeoPoint, to: GeoPoint) -> PlanResult<Vec<TerrainSample>> {
        Ok(profile_from(from, to, self.sample_spacing_m, |p| self.lookup(p)))
    }
}

/// Terrain loaded for a planning run.
#[derive(Debug, Clone)]
pub enum TerrainSource {
    Grid(GridElevationProvider),
    Profiles(RouteProfiles),
}

impl ElevationProvider for TerrainSource {
    fn point_elevation(&self, lat: f64, lon: f64) -> PlanResult<f64> {
        match self {
            Self::Grid(provider) => provider.point_elevation(lat, lon),
            Self::Profiles(profiles) => profiles.point_elevation(lat, lon),
        }
    }

    fn line_profile(&self, from: GeoPoint, to: GeoPoint) -> PlanResult<Vec<TerrainSample>> {
        match self {
            Self::Grid(provider) => provider.line_profile(from, to),
            Self::Profiles(profiles) => profiles.line_profile(from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainBounds;

    /// Elevation rises 100 m per 0.01 degree of longitude.
    fn sloped_provider() -> GridElevationProvider {
        let bounds = TerrainBounds {
            min_lat: 45.99,
            max_lat: 46.01,
            min_lon: 7.0,
            max_lon: 7.02,
        };
        let mut values = Vec::new();
        for _row in 0..3 {
            values.extend([Some(500.0), Some(600.0), Some(700.0)]);
        }
        GridElevationProvider::new(TerrainGrid::new(bounds, 3, 3, values).unwrap(), 30.0)
    }

    #[test]
    fn point_elevation_interpolates_grid() {
        let provider = sloped_provider();
        let elevation = provider.point_elevation(46.0, 7.005).unwrap();
        assert!((elevation - 550.0).abs() < 1e-6);
    }

    #[test]
    fn point_outside_grid_is_missing_data() {
        let provider = sloped_provider();
        let err = provider.point_elevation(47.0, 7.0).unwrap_err();
        assert_eq!(err, PlanError::MissingElevationData { lat: 47.0, lon: 7.0 });
    }

    #[test]
    fn line_profile_includes_endpoints_at_spacing() {
        let provider = sloped_provider();
        let from = GeoPoint::new(46.0, 7.0);
        let to = GeoPoint::new(46.0, 7.02);
        let samples = provider.line_profile(from, to).unwrap();

        let length = distance_between(from, to);
        assert_eq!(samples.len(), (length / 30.0).ceil() as usize + 1);
        assert_eq!(samples[0].distance_from_origin_m, 0.0);
        assert_eq!(samples[0].elevation_m, Some(500.0));
        let last = samples.last().unwrap();
        assert!((last.distance_from_origin_m - length).abs() < 1e-6);
        assert!((last.elevation_m.unwrap() - 700.0).abs() < 1e-6);
        assert!(samples
            .windows(2)
            .all(|w| w[0].distance_from_origin_m < w[1].distance_from_origin_m));
    }

    #[test]
    fn line_leaving_grid_yields_missing_samples() {
        let provider = sloped_provider();
        let samples = provider
            .line_profile(GeoPoint::new(46.0, 7.01), GeoPoint::new(46.0, 7.05))
            .unwrap();
        assert!(samples.first().unwrap().elevation_m.is_some());
        assert!(samples.last().unwrap().elevation_m.is_none());
    }

    /// A 20 m wide spike every ~1.1 km, far narrower than a coarse grid cell.
    fn spiky(point: GeoPoint) -> Option<f64> {
        let phase = (point.lon * 100.0).fract();
        Some(if phase < 0.02 { 900.0 } else { 100.0 })
    }

    #[test]
    fn route_profiles_keep_every_leg_sample() {
        let route = [
            GeoPoint::new(46.0, 7.0),
            GeoPoint::new(46.0, 7.03),
            GeoPoint::new(46.0, 7.0),
        ];
        let points = RouteProfiles::sample_points(&route, 10.0);
        let elevations = points.iter().map(|p| spiky(*p)).collect();
        let profiles = RouteProfiles::from_elevations(10.0, &points, elevations).unwrap();

        let samples = profiles.line_profile(route[0], route[1]).unwrap();
        assert!(samples.iter().all(|s| s.elevation_m.is_some()));
        assert!(samples.iter().any(|s| s.elevation_m == Some(900.0)));
        assert_eq!(profiles.point_elevation(46.0, 7.03).unwrap(), spiky(route[1]).unwrap());

        let back = profiles.line_profile(route[1], route[2]).unwrap();
        assert!(back.iter().all(|s| s.elevation_m.is_some()));
    }

    #[test]
    fn route_profiles_have_no_data_off_route() {
        let route = [GeoPoint::new(46.0, 7.0), GeoPoint::new(46.0, 7.01)];
        let points = RouteProfiles::sample_points(&route, 30.0);
        let elevations = vec![Some(400.0); points.len()];
        let profiles = RouteProfiles::from_elevations(30.0, &points, elevations).unwrap();

        assert!(matches!(
            profiles.point_elevation(46.5, 7.0),
            Err(PlanError::MissingElevationData { .. })
        ));
        let other = profiles
            .line_profile(GeoPoint::new(46.0, 7.0), GeoPoint::new(46.01, 7.0))
            .unwrap();
        assert!(other.last().unwrap().elevation_m.is_none());

        let err = RouteProfiles::from_elevations(30.0, &points, vec![Some(1.0)]).unwrap_err();
        assert!(matches!(err, TerrainError::SampleCount { .. }));
    }

    #[test]
    fn shared_waypoints_are_fetched_once() {
        let route = [
            GeoPoint::new(46.0, 7.0),
            GeoPoint::new(46.0, 7.001),
            GeoPoint::new(46.0, 7.0),
        ];
        let points = RouteProfiles::sample_points(&route, 30.0);
        let unique: HashSet<_> = points.iter().map(|p| point_key(*p)).collect();
        assert_eq!(unique.len(), points.len());
    }
}
