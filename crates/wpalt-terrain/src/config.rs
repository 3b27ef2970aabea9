//! Terrain provider configuration from environment.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.open-meteo.com/v1/elevation";

#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Elevation endpoint taking comma-separated `latitude`/`longitude` lists
    pub provider_url: String,
    /// Terrain spacing in meters, for grid nodes and leg samples alike
    pub sample_spacing_m: f64,
    pub max_grid_points: usize,
    pub max_points_per_request: usize,
    pub request_timeout_s: u64,
    pub cache_ttl_s: u64,
    /// Directory for fetched grids; `None` keeps them in memory only
    pub cache_dir: Option<PathBuf>,
    /// Attempts per provider request before giving up
    pub max_attempts: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            sample_spacing_m: 30.0,
            max_grid_points: 20_000,
            max_points_per_request: 100,
            request_timeout_s: 15,
            cache_ttl_s: 7 * 24 * 3600,
            cache_dir: None,
            max_attempts: 4,
        }
    }
}

impl TerrainConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider_url: env::var("WPALT_TERRAIN_URL").unwrap_or(defaults.provider_url),
            sample_spacing_m: parse_env("WPALT_TERRAIN_SPACING_M").unwrap_or(defaults.sample_spacing_m),
            max_grid_points: parse_env("WPALT_TERRAIN_MAX_GRID_POINTS").unwrap_or(defaults.max_grid_points),
            max_points_per_request: parse_env("WPALT_TERRAIN_MAX_POINTS_PER_REQUEST")
                .unwrap_or(defaults.max_points_per_request),
            request_timeout_s: parse_env("WPALT_TERRAIN_TIMEOUT_S").unwrap_or(defaults.request_timeout_s),
            cache_ttl_s: parse_env("WPALT_TERRAIN_CACHE_TTL_S").unwrap_or(defaults.cache_ttl_s),
            cache_dir: env::var("WPALT_TERRAIN_CACHE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_attempts: parse_env("WPALT_TERRAIN_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
