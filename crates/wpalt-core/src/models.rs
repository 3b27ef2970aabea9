//! Core data models for waypoint routes and planning results.

use crate::altitude::{AbsoluteAltitude, AltitudeAnchor, RelativeAltitude};
use crate::profile::ProfilePoint;
use serde::{Deserialize, Serialize};

/// Mission action tag for a return-to-home waypoint.
pub const RETURN_TO_HOME: &str = "RTH";

/// A mission waypoint as read from a route file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Unique sequence number, defines route order
    pub number: u32,
    /// Free-form mission action (e.g. "WAYPOINT", "RTH")
    #[serde(default)]
    pub action: String,
    pub lat: f64,
    pub lon: f64,
    /// Altitude relative to the ground elevation at the first waypoint
    #[serde(alias = "alt")]
    pub altitude: RelativeAltitude,
}

impl Waypoint {
    pub fn new(number: u32, action: impl Into<String>, lat: f64, lon: f64, altitude_m: i32) -> Self {
        Self {
            number,
            action: action.into(),
            lat,
            lon,
            altitude: RelativeAltitude(altitude_m),
        }
    }

    pub fn is_return_to_home(&self) -> bool {
        self.action.trim().eq_ignore_ascii_case(RETURN_TO_HOME)
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Horizontal position in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Per-leg planning record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegReport {
    pub from: u32,
    pub to: u32,
    /// Distance along the filtered profile, meters
    pub distance_m: f64,
    pub raw_samples: usize,
    /// Samples excluded by the anomaly floor
    pub dropped_samples: usize,
    /// Simplified profile the solver checked
    pub profile: Vec<ProfilePoint>,
    pub start_altitude: AbsoluteAltitude,
    pub end_altitude: AbsoluteAltitude,
    /// Tightening adjustments applied to the end altitude
    pub passes: usize,
}

/// Output of a planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub anchor: AltitudeAnchor,
    /// Waypoints in route order with corrected relative altitudes
    pub waypoints: Vec<Waypoint>,
    /// Absolute altitudes in the same order as `waypoints`
    pub absolute_altitudes: Vec<AbsoluteAltitude>,
    pub legs: Vec<LegReport>,
}

impl RoutePlan {
    /// Corrected altitude for a waypoint number.
    pub fn altitude_for(&self, number: u32) -> Option<RelativeAltitude> {
        self.waypoints
            .iter()
            .find(|wp| wp.number == number)
            .map(|wp| wp.altitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_to_home_is_case_insensitive() {
        assert!(Waypoint::new(3, "RTH", 0.0, 0.0, 0).is_return_to_home());
        assert!(Waypoint::new(3, " rth ", 0.0, 0.0, 0).is_return_to_home());
        assert!(!Waypoint::new(3, "WAYPOINT", 0.0, 0.0, 0).is_return_to_home());
    }

    #[test]
    fn waypoint_accepts_alt_alias() {
        let wp: Waypoint =
            serde_json::from_str(r#"{"number":1,"lat":46.1,"lon":7.2,"alt":120}"#).unwrap();
        assert_eq!(wp.altitude, RelativeAltitude(120));
        assert!(wp.action.is_empty());
    }
}
