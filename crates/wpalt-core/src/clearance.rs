//! Leg clearance solver.
//!
//! Given the already-resolved start altitude of a leg and its simplified
//! terrain profile, raise the end altitude until the straight climb or
//! descent between them clears every profile point by the margin.
//!
//! Only the end altitude moves, so consecutive legs share their waypoint
//! altitude exactly. Each pass corrects the first violating point (in
//! distance order) by projecting its deficit onto the end of the leg, then
//! rescans: raising the end changes the slope for every point, so a single
//! projection is only a first-order estimate.

use crate::altitude::AbsoluteAltitude;
use crate::profile::ProfilePoint;
use thiserror::Error;

/// Default bound on tightening passes per leg.
pub const DEFAULT_MAX_PASSES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClearanceError {
    #[error("no fixed point after {passes} passes (last candidate {last_candidate})")]
    NotConverged {
        passes: usize,
        last_candidate: AbsoluteAltitude,
    },
}

/// Inputs for one leg.
#[derive(Debug, Clone, Copy)]
pub struct LegInput<'a> {
    pub start_altitude: AbsoluteAltitude,
    /// Simplified profile, ascending distance from the leg start
    pub profile: &'a [ProfilePoint],
    pub leg_distance_m: f64,
    pub initial_end_altitude: AbsoluteAltitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegSolution {
    pub end_altitude: AbsoluteAltitude,
    /// Number of adjustments applied; zero when the initial candidate cleared
    pub passes: usize,
}

/// Minimum end altitude that keeps the leg clear of terrain.
pub fn solve_end_altitude(
    leg: &LegInput<'_>,
    min_clearance_m: u32,
    max_passes: usize,
) -> Result<LegSolution, ClearanceError> {
    let mut candidate = leg.initial_end_altitude;
    let leg_distance = leg.leg_distance_m;
    let clearance = f64::from(min_clearance_m);

    if !leg_distance.is_finite() || leg_distance <= 0.0 {
        return Ok(stationary_leg(leg, candidate, clearance));
    }

    let mut passes = 0usize;

    while let Some(adjustment) = first_violation(leg, candidate, clearance) {
        if passes >= max_passes {
            return Err(ClearanceError::NotConverged {
                passes,
                last_candidate: candidate,
            });
        }
        candidate = candidate.raised_by(adjustment);
        passes += 1;
    }

    Ok(LegSolution {
        end_altitude: candidate,
        passes,
    })
}

/// A leg with no horizontal extent has no slope to project onto; the end
/// altitude must clear the highest sampled point directly.
fn stationary_leg(leg: &LegInput<'_>, candidate: AbsoluteAltitude, clearance: f64) -> LegSolution {
    let required = leg
        .profile
        .iter()
        .map(|point| point.elevation_m + clearance)
        .filter(|value| value.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    if candidate.as_f64() >= required {
        return LegSolution {
            end_altitude: candidate,
            passes: 0,
        };
    }
    LegSolution {
        end_altitude: candidate.raised_by(clamp_adjustment((required - candidate.as_f64()).ceil())),
        passes: 1,
    }
}

/// End-altitude increase demanded by the first violating point, if any.
fn first_violation(leg: &LegInput<'_>, candidate: AbsoluteAltitude, clearance: f64) -> Option<i32> {
    let start = leg.start_altitude.as_f64();
    let rise = candidate.as_f64() - start;

    for point in leg.profile {
        let d = point.distance_m;
        if !(d > 0.0) {
            continue;
        }
        let fraction = d / leg.leg_distance_m;
        let expected = start + rise * fraction;
        let required = point.elevation_m + clearance;
        if expected < required {
            let deficit = required - expected;
            let at_end = (deficit * leg.leg_distance_m / d).ceil();
            return Some(clamp_adjustment(at_end));
        }
    }
    None
}

fn clamp_adjustment(meters: f64) -> i32 {
    if meters >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        (meters as i32).max(1)
    }
}

/// Altitude on the straight line between the leg ends at distance `d`.
pub fn interpolated_altitude(start: AbsoluteAltitude, end: AbsoluteAltitude, leg_distance_m: f64, d: f64) -> f64 {
    if leg_distance_m <= 0.0 {
        return start.as_f64();
    }
    start.as_f64() + (end.as_f64() - start.as_f64()) * (d / leg_distance_m)
}
