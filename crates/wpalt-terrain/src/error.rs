use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid terrain configuration: {0}")]
    Config(String),
    #[error("no finite coordinates to build a terrain grid from")]
    EmptyBounds,
    #[error("terrain provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("terrain provider HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("terrain provider response missing elevation")]
    MissingElevation,
    #[error("terrain provider returned {actual} samples for {expected} coordinates")]
    SampleCount { expected: usize, actual: usize },
    #[error("terrain grid would need {resolved_m:.0} m spacing, requested {requested_m:.0} m")]
    GridTooCoarse { requested_m: f64, resolved_m: f64 },
    #[error("terrain grid has {actual} cells, expected {expected}")]
    GridShape { expected: usize, actual: usize },
    #[error("terrain cache {path:?}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("terrain cache {path:?} is corrupt: {source}")]
    CacheDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
