//! Terrain acquisition and sampling for the wpalt planner.

pub mod backoff;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod provider;

pub use config::TerrainConfig;
pub use error::TerrainError;
pub use fetch::{fetch_route_profiles, fetch_terrain_grid, load_terrain, MAX_GRID_COARSENING};
pub use grid::{GridPlan, TerrainBounds, TerrainGrid};
pub use provider::{GridElevationProvider, RouteProfiles, TerrainSource};
