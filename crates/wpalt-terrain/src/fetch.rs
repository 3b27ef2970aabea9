//! Terrain acquisition from an Open-Meteo compatible elevation endpoint.
//!
//! A grid covering the padded route bounds is fetched once per run, chunked
//! to the provider's per-request limit. Grids are looked up in the memory
//! cache, then on disk, and only downloaded when missing or expired. When
//! the point budget would force a grid much coarser than the requested
//! spacing, elevations are fetched directly along each leg instead.

use crate::backoff::Backoff;
use crate::cache::{cache_key, load_disk, lookup_memory, store_disk, store_memory};
use crate::config::TerrainConfig;
use crate::error::TerrainError;
use crate::grid::{bounds_from_points, expand_bounds, grid_nodes, resolve_grid_dims, TerrainGrid};
use crate::provider::{GridElevationProvider, RouteProfiles, TerrainSource};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use wpalt_core::GeoPoint;

const BOUNDS_PAD_RATIO: f64 = 0.2;

/// Largest ratio of grid spacing to requested spacing accepted for a grid.
pub const MAX_GRID_COARSENING: f64 = 1.5;

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<Option<f64>>>,
}

/// Terrain for `route`: a grid when one fits the point budget at close to
/// the requested spacing, otherwise elevations sampled along every leg.
pub async fn load_terrain(
    client: &Client,
    config: &TerrainConfig,
    route: &[GeoPoint],
) -> Result<TerrainSource, TerrainError> {
    match fetch_terrain_grid(client, config, route).await {
        Ok(grid) => {
            let spacing_m = grid.spacing_m().max(config.sample_spacing_m);
            Ok(TerrainSource::Grid(GridElevationProvider::new(grid, spacing_m)))
        }
        Err(TerrainError::GridTooCoarse {
            requested_m,
            resolved_m,
        }) => {
            tracing::warn!(
                "Terrain grid would need {:.0} m spacing for the requested {:.0} m; sampling legs directly",
                resolved_m,
                requested_m
            );
            Ok(TerrainSource::Profiles(
                fetch_route_profiles(client, config, route).await?,
            ))
        }
        Err(err) => Err(err),
    }
}

pub async fn fetch_terrain_grid(
    client: &Client,
    config: &TerrainConfig,
    points: &[GeoPoint],
) -> Result<TerrainGrid, TerrainError> {
    check_config(config)?;
    if config.max_grid_points == 0 {
        return Err(TerrainError::Config("max_grid_points must be > 0".to_string()));
    }

    let bounds = bounds_from_points(points)
        .map(|bounds| expand_bounds(&bounds, BOUNDS_PAD_RATIO))
        .ok_or(TerrainError::EmptyBounds)?;
    let spacing_m = config.sample_spacing_m.max(5.0);
    let ttl = Duration::from_secs(config.cache_ttl_s.max(30));
    let key = cache_key(&bounds, spacing_m);

    if let Some(grid) = lookup_memory(&bounds, spacing_m, ttl) {
        tracing::debug!("Terrain grid served from memory cache");
        return Ok(grid);
    }
    if let Some(dir) = &config.cache_dir {
        match load_disk(dir, &key, ttl) {
            Ok(Some(grid)) => {
                store_memory(key, spacing_m, grid.clone(), ttl);
                return Ok(grid);
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("Ignoring terrain cache entry: {}", err),
        }
    }

    let plan = resolve_grid_dims(&bounds, spacing_m, config.max_grid_points);
    if plan.spacing_m > spacing_m * MAX_GRID_COARSENING {
        return Err(TerrainError::GridTooCoarse {
            requested_m: spacing_m,
            resolved_m: plan.spacing_m,
        });
    }
    if plan.spacing_m > spacing_m {
        tracing::warn!(
            "Terrain grid coarsened to {:.0} m (requested {:.0} m) to stay under {} points",
            plan.spacing_m,
            spacing_m,
            config.max_grid_points
        );
    }

    let nodes = grid_nodes(&bounds, plan.rows, plan.cols);
    tracing::info!(
        "Fetching {}x{} terrain grid ({} points, {:.0} m spacing) from {}",
        plan.rows,
        plan.cols,
        nodes.len(),
        plan.spacing_m,
        config.provider_url
    );
    let elevations = fetch_elevations(client, config, &nodes).await?;

    let grid = TerrainGrid::new(bounds, plan.rows, plan.cols, elevations)?;
    if let Some(dir) = &config.cache_dir {
        match store_disk(dir, &key, spacing_m, &grid) {
            Ok(path) => tracing::debug!("Stored terrain grid at {}", path.display()),
            Err(err) => tracing::warn!("Failed to store terrain cache: {}", err),
        }
    }
    store_memory(key, spacing_m, grid.clone(), ttl);

    Ok(grid)
}

/// Elevations sampled every `sample_spacing_m` along each leg of `route`.
pub async fn fetch_route_profiles(
    client: &Client,
    config: &TerrainConfig,
    route: &[GeoPoint],
) -> Result<RouteProfiles, TerrainError> {
    check_config(config)?;
    if route.is_empty() {
        return Err(TerrainError::EmptyBounds);
    }
    let points = RouteProfiles::sample_points(route, config.sample_spacing_m);
    tracing::info!(
        "Fetching {} leg profile points at {:.0} m spacing from {}",
        points.len(),
        config.sample_spacing_m,
        config.provider_url
    );
    let elevations = fetch_elevations(client, config, &points).await?;
    RouteProfiles::from_elevations(config.sample_spacing_m, &points, elevations)
}

fn check_config(config: &TerrainConfig) -> Result<(), TerrainError> {
    if config.provider_url.trim().is_empty() {
        return Err(TerrainError::Config("terrain provider URL is empty".to_string()));
    }
    if !config.sample_spacing_m.is_finite() || config.sample_spacing_m <= 0.0 {
        return Err(TerrainError::Config(format!(
            "sample spacing must be a positive number, got {}",
            config.sample_spacing_m
        )));
    }
    Ok(())
}

/// Elevation per point in order, chunked by `max_points_per_request`.
/// Non-finite values become `None`.
async fn fetch_elevations(
    client: &Client,
    config: &TerrainConfig,
    points: &[GeoPoint],
) -> Result<Vec<Option<f64>>, TerrainError> {
    let chunk_size = config.max_points_per_request.max(1);
    let timeout = Duration::from_secs(config.request_timeout_s.max(3));
    tracing::debug!(
        "Requesting {} elevations in {} requests",
        points.len(),
        points.len().div_ceil(chunk_size)
    );

    let mut elevations = Vec::with_capacity(points.len());
    for (idx, chunk) in points.chunks(chunk_size).enumerate() {
        let values = fetch_chunk_with_retry(client, config, chunk, timeout).await?;
        tracing::debug!("Terrain chunk {} returned {} samples", idx, values.len());
        elevations.extend(values.into_iter().map(|value| value.filter(|v| v.is_finite())));
    }

    let missing = elevations.iter().filter(|value| value.is_none()).count();
    if missing > 0 {
        tracing::warn!("Terrain provider had no data for {} of {} points", missing, elevations.len());
    }
    Ok(elevations)
}

async fn fetch_chunk_with_retry(
    client: &Client,
    config: &TerrainConfig,
    chunk: &[GeoPoint],
    timeout: Duration,
) -> Result<Vec<Option<f64>>, TerrainError> {
    let url = build_provider_url(
        &config.provider_url,
        &join_params(chunk.iter().map(|p| p.lat)),
        &join_params(chunk.iter().map(|p| p.lon)),
    );
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(8));

    loop {
        match fetch_chunk(client, &url, chunk.len(), timeout).await {
            Ok(values) => return Ok(values),
            Err(err) if is_retryable(&err) && backoff.attempts() + 1 < max_attempts => {
                let delay = backoff.fail();
                tracing::warn!(
                    "Terrain request failed ({}), retry {}/{} in {:?}",
                    err,
                    backoff.attempts(),
                    max_attempts - 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn fetch_chunk(
    client: &Client,
    url: &str,
    expected: usize,
    timeout: Duration,
) -> Result<Vec<Option<f64>>, TerrainError> {
    let response = client.get(url).timeout(timeout).send().await?;
    if !response.status().is_success() {
        return Err(TerrainError::Status(response.status()));
    }

    let payload: OpenMeteoElevationResponse = response.json().await?;
    let values = payload.elevation.ok_or(TerrainError::MissingElevation)?;
    if values.len() != expected {
        return Err(TerrainError::SampleCount {
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}

fn is_retryable(err: &TerrainError) -> bool {
    match err {
        TerrainError::Request(_) => true,
        TerrainError::Status(status) => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        _ => false,
    }
}

fn join_params(values: impl Iterator<Item = f64>) -> String {
    let mut buf = String::new();
    for (idx, value) in values.enumerate() {
        if idx > 0 {
            buf.push(',');
        }
        buf.push_str(&format!("{:.6}", value));
    }
    buf
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}latitude={}&longitude={}",
        base, separator, latitudes, longitudes
    )
}
