//! Altitude reference handling.
//!
//! Route files carry altitudes relative to the ground under the first
//! waypoint. Clearance math needs altitudes above sea level. The two are
//! kept as separate types and only [`AltitudeAnchor`] converts between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole meters above mean sea level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsoluteAltitude(pub i32);

/// Whole meters relative to the anchor elevation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativeAltitude(pub i32);

impl AbsoluteAltitude {
    pub fn meters(self) -> i32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Raise the altitude by `meters`, saturating at the i32 range.
    pub fn raised_by(self, meters: i32) -> Self {
        Self(self.0.saturating_add(meters))
    }
}

impl RelativeAltitude {
    pub fn meters(self) -> i32 {
        self.0
    }
}

impl fmt::Display for AbsoluteAltitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m AMSL", self.0)
    }
}

impl fmt::Display for RelativeAltitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m", self.0)
    }
}

/// Convert a sampled ground elevation to whole meters.
///
/// Rounds up, not toward zero: results can sit up to 1 m above a truncating
/// conversion, never below the sampled ground.
pub fn ground_meters(elevation_m: f64) -> i32 {
    let rounded = elevation_m.ceil();
    if rounded >= f64::from(i32::MAX) {
        i32::MAX
    } else if rounded <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        rounded as i32
    }
}

/// Ground elevation at the first waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltitudeAnchor {
    elevation_m: i32,
}

impl AltitudeAnchor {
    pub fn new(elevation_m: i32) -> Self {
        Self { elevation_m }
    }

    pub fn from_ground_elevation(elevation_m: f64) -> Self {
        Self::new(ground_meters(elevation_m))
    }

    pub fn elevation_m(self) -> i32 {
        self.elevation_m
    }

    pub fn to_absolute(self, altitude: RelativeAltitude) -> AbsoluteAltitude {
        AbsoluteAltitude(self.elevation_m.saturating_add(altitude.0))
    }

    pub fn to_relative(self, altitude: AbsoluteAltitude) -> RelativeAltitude {
        RelativeAltitude(altitude.0.saturating_sub(self.elevation_m))
    }
}
