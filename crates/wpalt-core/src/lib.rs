pub mod altitude;
pub mod clearance;
pub mod error;
pub mod models;
pub mod planner;
pub mod profile;
pub mod simplify;
pub mod spatial;

pub use altitude::{ground_meters, AbsoluteAltitude, AltitudeAnchor, RelativeAltitude};
pub use clearance::{
    interpolated_altitude, solve_end_altitude, ClearanceError, LegInput, LegSolution,
    DEFAULT_MAX_PASSES,
};
pub use error::{PlanError, PlanResult};
pub use models::{GeoPoint, LegReport, RoutePlan, Waypoint, RETURN_TO_HOME};
pub use planner::{plan_route, prepare_route, PlannerConfig};
pub use profile::{
    filter_anomalies, profile_metrics, ElevationProvider, ProfilePoint, ProfileSimplifier,
    TerrainSample, DEFAULT_ANOMALY_FLOOR_M, DEFAULT_SIMPLIFY_TOLERANCE_M,
};
pub use simplify::DouglasPeucker;
pub use spatial::haversine_distance;
