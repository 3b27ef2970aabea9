//! Route planner scenarios against synthetic terrain.
//!
//! Run with: cargo test -p wpalt-core --test planner_test

use std::cell::RefCell;

use wpalt_core::spatial::{distance_between, interpolate};
use wpalt_core::{
    interpolated_altitude, plan_route, DouglasPeucker, ElevationProvider, GeoPoint, PlanError,
    PlanResult, PlannerConfig, ProfilePoint, ProfileSimplifier, RelativeAltitude, RoutePlan,
    TerrainSample, Waypoint,
};

const SPACING_M: f64 = 30.0;

/// Terrain defined by a function of (lat, lon); `None` means no data.
struct SyntheticTerrain<F> {
    elevation: F,
    lines: RefCell<Vec<(GeoPoint, GeoPoint)>>,
}

impl<F> SyntheticTerrain<F>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn new(elevation: F) -> Self {
        Self {
            elevation,
            lines: RefCell::new(Vec::new()),
        }
    }
}

impl<F> ElevationProvider for SyntheticTerrain<F>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn point_elevation(&self, lat: f64, lon: f64) -> PlanResult<f64> {
        (self.elevation)(lat, lon).ok_or(PlanError::MissingElevationData { lat, lon })
    }

    fn line_profile(&self, from: GeoPoint, to: GeoPoint) -> PlanResult<Vec<TerrainSample>> {
        self.lines.borrow_mut().push((from, to));
        let length = distance_between(from, to);
        let steps = ((length / SPACING_M).ceil() as usize).max(1);
        Ok((0..=steps)
            .map(|i| {
                let p = interpolate(from, to, i as f64 / steps as f64);
                TerrainSample {
                    lat: p.lat,
                    lon: p.lon,
                    elevation_m: (self.elevation)(p.lat, p.lon),
                    distance_from_origin_m: distance_between(from, p),
                }
            })
            .collect())
    }
}

/// Records what the planner hands to the simplifier.
#[derive(Default)]
struct RecordingSimplifier {
    inputs: RefCell<Vec<Vec<ProfilePoint>>>,
}

impl ProfileSimplifier for RecordingSimplifier {
    fn simplify(&self, profile: &[ProfilePoint], tolerance_m: f64) -> Vec<ProfilePoint> {
        self.inputs.borrow_mut().push(profile.to_vec());
        DouglasPeucker.simplify(profile, tolerance_m)
    }
}

fn ridge(lon: f64, center: f64, half_width: f64, height: f64) -> f64 {
    height * (1.0 - (lon - center).abs() / half_width).max(0.0)
}

fn assert_clearance(plan: &RoutePlan, min_clearance_m: u32) {
    for leg in &plan.legs {
        for point in &leg.profile {
            let alt = interpolated_altitude(
                leg.start_altitude,
                leg.end_altitude,
                leg.distance_m,
                point.distance_m,
            );
            assert!(
                alt >= point.elevation_m + f64::from(min_clearance_m) - 1.0,
                "leg #{} -> #{}: altitude {alt:.1} at {:.0} m is below terrain {:.1} + {min_clearance_m}",
                leg.from,
                leg.to,
                point.distance_m,
                point.elevation_m
            );
        }
    }
}

#[test]
fn flat_terrain_keeps_sufficient_altitudes() {
    let terrain = SyntheticTerrain::new(|_, _| Some(0.0));
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 100),
        Waypoint::new(2, "WAYPOINT", 0.0, 1.0, 50),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(50)).unwrap();

    let anchor = plan.anchor.elevation_m();
    assert_eq!(plan.absolute_altitudes[0].meters(), anchor + 100);
    assert_eq!(plan.legs.len(), 1);
    assert_eq!(plan.legs[0].passes, 0);
    // Initial candidate is ground at #2 plus its nominal altitude, already clear of flat terrain.
    let end = plan.absolute_altitudes[1].meters();
    assert_eq!(end, anchor + 50);
    assert_eq!(plan.waypoints[1].altitude, RelativeAltitude(end - anchor));
    assert_clearance(&plan, 50);
}

#[test]
fn ridge_raises_end_of_leg_to_clear_it() {
    let terrain = SyntheticTerrain::new(|_, lon| Some(ridge(lon, 0.05, 0.005, 400.0)));
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 60),
        Waypoint::new(2, "WAYPOINT", 0.0, 0.1, 60),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(50)).unwrap();

    assert!(plan.legs[0].passes > 0);
    // Ridge sits mid-leg: crossing ~450 m there from 60 m needs roughly 840 m at the end.
    // The sampled crest may sit up to half a sample below the true 400 m peak.
    let end = plan.waypoints[1].altitude.meters();
    assert!(end >= 815, "end altitude {end} too low");
    assert!(end <= 845, "end altitude {end} overshoots");
    assert_eq!(plan.waypoints[0].altitude, RelativeAltitude(60));
    assert_clearance(&plan, 50);
}

#[test]
fn legs_share_waypoint_altitudes() {
    let terrain = SyntheticTerrain::new(|_, lon| {
        Some(ridge(lon, 0.03, 0.004, 250.0) + ridge(lon, 0.08, 0.004, 600.0) + ridge(lon, 0.13, 0.004, 120.0))
    });
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 40),
        Waypoint::new(2, "WAYPOINT", 0.0, 0.05, 40),
        Waypoint::new(3, "WAYPOINT", 0.0, 0.1, 40),
        Waypoint::new(4, "WAYPOINT", 0.0, 0.15, 40),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(30)).unwrap();

    assert_eq!(plan.legs.len(), 3);
    assert_eq!(plan.legs[0].start_altitude, plan.absolute_altitudes[0]);
    for (idx, pair) in plan.legs.windows(2).enumerate() {
        assert_eq!(pair[0].end_altitude, pair[1].start_altitude);
        assert_eq!(pair[0].end_altitude, plan.absolute_altitudes[idx + 1]);
    }
    assert_clearance(&plan, 30);
}

#[test]
fn anchor_converts_both_ways_with_same_elevation() {
    let terrain = SyntheticTerrain::new(|_, lon| Some(123.4 + lon * 1000.0));
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 80),
        Waypoint::new(2, "WAYPOINT", 0.0, 0.02, 80),
        Waypoint::new(3, "WAYPOINT", 0.0, 0.04, 80),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(20)).unwrap();

    assert_eq!(plan.anchor.elevation_m(), 124);
    assert_eq!(plan.waypoints[0].altitude, RelativeAltitude(80));
    for (wp, absolute) in plan.waypoints.iter().zip(&plan.absolute_altitudes) {
        assert_eq!(plan.anchor.to_absolute(wp.altitude), *absolute);
        assert_eq!(plan.anchor.to_relative(*absolute), wp.altitude);
    }
    assert_clearance(&plan, 20);
}

#[test]
fn return_to_home_leg_is_sampled_back_to_origin() {
    let terrain = SyntheticTerrain::new(|_, _| Some(15.0));
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 50),
        Waypoint::new(2, "WAYPOINT", 0.01, 0.01, 50),
        Waypoint::new(3, "RTH", 45.0, 90.0, 0),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(10)).unwrap();

    let lines = terrain.lines.borrow();
    let (_, closing_end) = lines.last().copied().unwrap();
    assert_eq!(closing_end, GeoPoint::new(0.0, 0.0));
    assert_eq!(plan.waypoints[2].position(), plan.waypoints[0].position());
    assert_eq!(plan.waypoints[2].action, "RTH");
}

#[test]
fn anomalous_depressions_never_reach_simplifier_or_solver() {
    let terrain = SyntheticTerrain::new(|_, lon| {
        if (lon - 0.005).abs() < 0.0005 {
            Some(-500.0)
        } else {
            Some(10.0)
        }
    });
    let simplifier = RecordingSimplifier::default();
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 40),
        Waypoint::new(2, "WAYPOINT", 0.0, 0.01, 40),
    ];

    let plan = plan_route(&terrain, &simplifier, route, &PlannerConfig::with_min_clearance(25)).unwrap();

    assert!(plan.legs[0].dropped_samples > 0);
    let inputs = simplifier.inputs.borrow();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].iter().all(|point| point.elevation_m > -414.0));
    assert!(plan.legs[0].profile.iter().all(|point| point.elevation_m > -414.0));
    assert_eq!(plan.legs[0].passes, 0);
}

#[test]
fn missing_elevation_aborts_the_run() {
    let terrain = SyntheticTerrain::new(|_, lon| if lon > 0.5 { None } else { Some(0.0) });
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 100),
        Waypoint::new(2, "WAYPOINT", 0.0, 1.0, 100),
    ];

    let err = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::default()).unwrap_err();
    assert!(matches!(err, PlanError::MissingElevationData { .. }), "got {err:?}");
}

#[test]
fn non_converging_leg_reports_its_waypoints() {
    let terrain = SyntheticTerrain::new(|_, lon| {
        Some(ridge(lon, 0.01, 0.002, 200.0) + ridge(lon, 0.09, 0.002, 3000.0))
    });
    let route = || {
        vec![
            Waypoint::new(7, "WAYPOINT", 0.0, 0.0, 0),
            Waypoint::new(8, "WAYPOINT", 0.0, 0.1, 0),
        ]
    };
    let capped = PlannerConfig {
        min_clearance_m: 0,
        max_solver_passes: 1,
        ..PlannerConfig::default()
    };

    let err = plan_route(&terrain, &DouglasPeucker, route(), &capped).unwrap_err();
    assert_eq!(
        err,
        PlanError::ClearanceUnsolvable {
            from: 7,
            to: 8,
            passes: 1
        }
    );

    let plan = plan_route(&terrain, &DouglasPeucker, route(), &PlannerConfig::with_min_clearance(0)).unwrap();
    assert!(plan.legs[0].passes >= 2);
    assert_clearance(&plan, 0);
}

#[test]
fn output_is_sorted_and_matchable_by_number() {
    let terrain = SyntheticTerrain::new(|_, _| Some(0.0));
    let route = vec![
        Waypoint::new(2, "WAYPOINT", 0.0, 0.01, 70),
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 30),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(20)).unwrap();

    assert_eq!(plan.waypoints[0].number, 1);
    assert_eq!(plan.altitude_for(1), Some(RelativeAltitude(30)));
    assert_eq!(plan.altitude_for(2), Some(RelativeAltitude(70)));
    assert_eq!(plan.altitude_for(9), None);
}

#[test]
fn repeated_position_still_gets_clearance() {
    let terrain = SyntheticTerrain::new(|_, _| Some(0.0));
    let route = vec![
        Waypoint::new(1, "WAYPOINT", 0.0, 0.0, 100),
        Waypoint::new(2, "WAYPOINT", 0.0, 0.01, 100),
        Waypoint::new(3, "WAYPOINT", 0.0, 0.01, 0),
    ];

    let plan = plan_route(&terrain, &DouglasPeucker, route, &PlannerConfig::with_min_clearance(50)).unwrap();

    assert_eq!(plan.legs[1].distance_m, 0.0);
    assert_eq!(plan.legs[1].passes, 1);
    assert_eq!(plan.altitude_for(2), Some(RelativeAltitude(100)));
    assert_eq!(plan.altitude_for(3), Some(RelativeAltitude(50)));
}
