//! Error taxonomy for route planning.

use thiserror::Error;

/// Errors that abort a planning run.
///
/// Altitude correctness is a safety property, so none of these are ever
/// replaced by a default altitude.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    #[error("missing elevation data at lat {lat:.6}, lon {lon:.6}")]
    MissingElevationData { lat: f64, lon: f64 },
    #[error("terrain clearance unsolvable on leg #{from} -> #{to} after {passes} passes")]
    ClearanceUnsolvable { from: u32, to: u32, passes: usize },
    #[error("invalid planner configuration: {0}")]
    InvalidConfig(String),
}

pub type PlanResult<T> = Result<T, PlanError>;
