//! Route altitude planner.
//!
//! Folds the clearance solver over the legs of a route in order. Leg `i + 1`
//! starts at the altitude leg `i` resolved, so legs are never solved out of
//! order.

use crate::altitude::{ground_meters, AbsoluteAltitude, AltitudeAnchor};
use crate::clearance::{solve_end_altitude, ClearanceError, LegInput, DEFAULT_MAX_PASSES};
use crate::error::{PlanError, PlanResult};
use crate::models::{LegReport, RoutePlan, Waypoint};
use crate::profile::{
    filter_anomalies, profile_metrics, ElevationProvider, ProfileSimplifier,
    DEFAULT_ANOMALY_FLOOR_M, DEFAULT_SIMPLIFY_TOLERANCE_M,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Required vertical margin over terrain, meters
    pub min_clearance_m: u32,
    /// Samples at or below this elevation are discarded
    pub anomaly_floor_m: f64,
    pub simplify_tolerance_m: f64,
    /// Tightening passes allowed per leg
    pub max_solver_passes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_clearance_m: 50,
            anomaly_floor_m: DEFAULT_ANOMALY_FLOOR_M,
            simplify_tolerance_m: DEFAULT_SIMPLIFY_TOLERANCE_M,
            max_solver_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl PlannerConfig {
    pub fn with_min_clearance(min_clearance_m: u32) -> Self {
        Self {
            min_clearance_m,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> PlanResult<()> {
        if !self.simplify_tolerance_m.is_finite() || self.simplify_tolerance_m < 0.0 {
            return Err(PlanError::InvalidConfig(format!(
                "simplify tolerance must be a non-negative number, got {}",
                self.simplify_tolerance_m
            )));
        }
        if !self.anomaly_floor_m.is_finite() {
            return Err(PlanError::InvalidConfig("anomaly floor must be finite".to_string()));
        }
        if self.max_solver_passes == 0 {
            return Err(PlanError::InvalidConfig("max solver passes must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Sort, validate and close the loop of a route.
///
/// When the last waypoint is return-to-home its position becomes the first
/// waypoint's, so the closing leg is sampled along the path back home.
pub fn prepare_route(mut waypoints: Vec<Waypoint>) -> PlanResult<Vec<Waypoint>> {
    if waypoints.len() < 2 {
        return Err(PlanError::InvalidRoute(format!(
            "route needs at least two waypoints, got {}",
            waypoints.len()
        )));
    }

    waypoints.sort_by_key(|wp| wp.number);
    if let Some(pair) = waypoints.windows(2).find(|pair| pair[0].number == pair[1].number) {
        return Err(PlanError::InvalidRoute(format!(
            "duplicate waypoint number {}",
            pair[0].number
        )));
    }
    if let Some(wp) = waypoints.iter().find(|wp| !wp.position().is_finite()) {
        return Err(PlanError::InvalidRoute(format!(
            "waypoint #{} has non-finite coordinates",
            wp.number
        )));
    }

    let home = waypoints[0].position();
    if let Some(last) = waypoints.last_mut() {
        if last.is_return_to_home() {
            tracing::debug!(
                "Waypoint #{} is return-to-home, moving it to {:.6}, {:.6}",
                last.number,
                home.lat,
                home.lon
            );
            last.lat = home.lat;
            last.lon = home.lon;
        }
    }

    Ok(waypoints)
}

/// Running state threaded through the leg fold.
#[derive(Debug)]
struct Resolution {
    altitudes: Vec<AbsoluteAltitude>,
    legs: Vec<LegReport>,
}

/// Correct the altitudes of `waypoints` for terrain clearance.
pub fn plan_route<P, S>(
    provider: &P,
    simplifier: &S,
    waypoints: Vec<Waypoint>,
    config: &PlannerConfig,
) -> PlanResult<RoutePlan>
where
    P: ElevationProvider + ?Sized,
    S: ProfileSimplifier + ?Sized,
{
    config.validate()?;
    let route = prepare_route(waypoints)?;

    let first = &route[0];
    let ground = known_elevation(provider, first)?;
    let anchor = AltitudeAnchor::from_ground_elevation(ground);
    let start = anchor.to_absolute(first.altitude);
    tracing::info!(
        "Planning {} waypoints, anchor elevation {} m, clearance {} m",
        route.len(),
        anchor.elevation_m(),
        config.min_clearance_m
    );

    let initial = Resolution {
        altitudes: vec![start],
        legs: Vec::with_capacity(route.len() - 1),
    };
    let resolution = route.windows(2).try_fold(initial, |mut acc, pair| {
        let start = acc.altitudes.last().copied().unwrap_or(start);
        let leg = resolve_leg(provider, simplifier, &pair[0], &pair[1], start, config)?;
        acc.altitudes.push(leg.end_altitude);
        acc.legs.push(leg);
        Ok::<_, PlanError>(acc)
    })?;

    let waypoints = route
        .iter()
        .zip(&resolution.altitudes)
        .map(|(wp, absolute)| Waypoint {
            altitude: anchor.to_relative(*absolute),
            ..wp.clone()
        })
        .collect();

    let raised = resolution.legs.iter().filter(|leg| leg.passes > 0).count();
    tracing::info!(
        "Resolved {} legs, {} needed extra clearance",
        resolution.legs.len(),
        raised
    );

    Ok(RoutePlan {
        anchor,
        waypoints,
        absolute_altitudes: resolution.altitudes,
        legs: resolution.legs,
    })
}

fn resolve_leg<P, S>(
    provider: &P,
    simplifier: &S,
    from: &Waypoint,
    to: &Waypoint,
    start: AbsoluteAltitude,
    config: &PlannerConfig,
) -> PlanResult<LegReport>
where
    P: ElevationProvider + ?Sized,
    S: ProfileSimplifier + ?Sized,
{
    let samples = provider.line_profile(from.position(), to.position())?;
    let filtered = filter_anomalies(&samples, config.anomaly_floor_m)?;
    let dense = profile_metrics(from.position(), &filtered);
    let distance_m = dense.last().map(|point| point.distance_m).unwrap_or(0.0);
    let profile = simplifier.simplify(&dense, config.simplify_tolerance_m);

    let end_ground = known_elevation(provider, to)?;
    let candidate = AbsoluteAltitude(ground_meters(end_ground).saturating_add(to.altitude.meters()));

    let input = LegInput {
        start_altitude: start,
        profile: &profile,
        leg_distance_m: distance_m,
        initial_end_altitude: candidate,
    };
    let solution = solve_end_altitude(&input, config.min_clearance_m, config.max_solver_passes)
        .map_err(|err| match err {
            ClearanceError::NotConverged { passes, .. } => {
                tracing::warn!(
                    "Leg #{} -> #{} did not converge: {}",
                    from.number,
                    to.number,
                    err
                );
                PlanError::ClearanceUnsolvable {
                    from: from.number,
                    to: to.number,
                    passes,
                }
            }
        })?;

    tracing::debug!(
        "Leg #{} -> #{}: {:.0} m, {} samples ({} dropped), {} profile points, {} -> {} after {} passes",
        from.number,
        to.number,
        distance_m,
        samples.len(),
        samples.len() - filtered.len(),
        profile.len(),
        start,
        solution.end_altitude,
        solution.passes
    );

    Ok(LegReport {
        from: from.number,
        to: to.number,
        distance_m,
        raw_samples: samples.len(),
        dropped_samples: samples.len() - filtered.len(),
        profile,
        start_altitude: start,
        end_altitude: solution.end_altitude,
        passes: solution.passes,
    })
}

fn known_elevation<P>(provider: &P, wp: &Waypoint) -> PlanResult<f64>
where
    P: ElevationProvider + ?Sized,
{
    let elevation = provider.point_elevation(wp.lat, wp.lon)?;
    if elevation.is_finite() {
        Ok(elevation)
    } else {
        Err(PlanError::MissingElevationData {
            lat: wp.lat,
            lon: wp.lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_route_sorts_by_number() {
        let route = prepare_route(vec![
            Waypoint::new(3, "WAYPOINT", 0.0, 0.2, 10),
            Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 10),
            Waypoint::new(2, "WAYPOINT", 0.0, 0.1, 10),
        ])
        .unwrap();
        let numbers: Vec<u32> = route.iter().map(|wp| wp.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn prepare_route_rejects_short_and_duplicate_routes() {
        let err = prepare_route(vec![Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 10)]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidRoute(_)));

        let err = prepare_route(vec![
            Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 10),
            Waypoint::new(1, "WAYPOINT", 0.0, 0.1, 10),
        ])
        .unwrap_err();
        assert_eq!(err, PlanError::InvalidRoute("duplicate waypoint number 1".to_string()));
    }

    #[test]
    fn prepare_route_closes_return_to_home_loop() {
        let route = prepare_route(vec![
            Waypoint::new(1, "WAYPOINT", 46.0, 7.0, 50),
            Waypoint::new(2, "WAYPOINT", 46.1, 7.1, 50),
            Waypoint::new(3, "RTH", 12.0, 34.0, 0),
        ])
        .unwrap();
        assert_eq!(route[2].position(), route[0].position());
    }

    #[test]
    fn return_to_home_only_applies_to_last_waypoint() {
        let route = prepare_route(vec![
            Waypoint::new(1, "WAYPOINT", 46.0, 7.0, 50),
            Waypoint::new(2, "RTH", 46.1, 7.1, 50),
            Waypoint::new(3, "WAYPOINT", 46.2, 7.2, 0),
        ])
        .unwrap();
        assert_eq!(route[1].lat, 46.1);
        assert_eq!(route[2].lat, 46.2);
    }

    #[test]
    fn config_validation() {
        assert!(PlannerConfig::default().validate().is_ok());
        let config = PlannerConfig {
            max_solver_passes: 0,
            ..PlannerConfig::default()
        };
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
        let config = PlannerConfig {
            simplify_tolerance_m: -1.0,
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
