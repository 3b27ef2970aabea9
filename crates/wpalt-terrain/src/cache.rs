//! In-memory and on-disk caches for fetched terrain grids.

use crate::error::TerrainError;
use crate::grid::{TerrainBounds, TerrainGrid};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

const MAX_MEMORY_ENTRIES: usize = 16;

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

#[derive(Debug, Clone)]
pub struct MemoryEntry {
    fetched_at: Instant,
    spacing_m: f64,
    pub grid: TerrainGrid,
}

impl CacheEntry for MemoryEntry {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

fn memory_cache() -> &'static DashMap<String, MemoryEntry> {
    static CACHE: OnceLock<DashMap<String, MemoryEntry>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

pub fn cache_key(bounds: &TerrainBounds, spacing_m: f64) -> String {
    format!(
        "terrain_{:.4}_{:.4}_{:.4}_{:.4}_{:.1}",
        bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon, spacing_m
    )
}

/// A fresh in-memory grid covering `bounds` at `spacing_m` or finer.
pub fn lookup_memory(bounds: &TerrainBounds, spacing_m: f64, ttl: Duration) -> Option<TerrainGrid> {
    let cache = memory_cache();
    if let Some(entry) = cache.get(&cache_key(bounds, spacing_m)) {
        if entry.fetched_at.elapsed() <= ttl {
            return Some(entry.grid.clone());
        }
    }
    cache
        .iter()
        .find(|entry| {
            entry.fetched_at.elapsed() <= ttl
                && entry.spacing_m <= spacing_m
                && entry.grid.bounds().contains_bounds(bounds)
        })
        .map(|entry| entry.grid.clone())
}

pub fn store_memory(key: String, spacing_m: f64, grid: TerrainGrid, ttl: Duration) {
    let cache = memory_cache();
    cache.insert(
        key,
        MemoryEntry {
            fetched_at: Instant::now(),
            spacing_m,
            grid,
        },
    );
    prune_cache(cache, MAX_MEMORY_ENTRIES, ttl.saturating_mul(2));
}

pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    for (key, fetched_at) in &entries {
        if now.duration_since(*fetched_at) > max_age {
            cache.remove(key);
        }
    }

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    fetched_at: DateTime<Utc>,
    spacing_m: f64,
    grid: TerrainGrid,
}

fn disk_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// Load a grid from `dir` if present and younger than `ttl`.
pub fn load_disk(dir: &Path, key: &str, ttl: Duration) -> Result<Option<TerrainGrid>, TerrainError> {
    let path = disk_path(dir, key);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(TerrainError::CacheIo { path, source }),
    };
    let entry: DiskEntry =
        serde_json::from_slice(&bytes).map_err(|source| TerrainError::CacheDecode {
            path: path.clone(),
            source,
        })?;

    let age = Utc::now().signed_duration_since(entry.fetched_at);
    let max_age = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
    if age > max_age {
        tracing::debug!("Terrain cache {} expired ({}s old)", path.display(), age.num_seconds());
        return Ok(None);
    }
    tracing::debug!("Loaded terrain grid from {}", path.display());
    Ok(Some(entry.grid))
}

pub fn store_disk(dir: &Path, key: &str, spacing_m: f64, grid: &TerrainGrid) -> Result<PathBuf, TerrainError> {
    std::fs::create_dir_all(dir).map_err(|source| TerrainError::CacheIo {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = disk_path(dir, key);
    let entry = DiskEntry {
        fetched_at: Utc::now(),
        spacing_m,
        grid: grid.clone(),
    };
    let bytes = serde_json::to_vec(&entry).map_err(|source| TerrainError::CacheDecode {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, bytes).map_err(|source| TerrainError::CacheIo {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
