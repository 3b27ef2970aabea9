//! Route file loading and rendering, dispatched on file extension.

use crate::error::RouteFileError;
use crate::mission::{read_mission, write_mission};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wpalt_core::{PlanError, RoutePlan, Waypoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    Mission,
    Json,
}

impl RouteFormat {
    pub fn from_path(path: &Path) -> Result<Self, RouteFileError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("mission") | Some("xml") => Ok(Self::Mission),
            Some("json") => Ok(Self::Json),
            _ => Err(RouteFileError::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// JSON route layout: `{ "waypoints": [ { "number", "action", "lat", "lon", "altitude" } ] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRoute {
    pub waypoints: Vec<Waypoint>,
}

/// A loaded route together with its source text, so output can mirror the input.
#[derive(Debug, Clone)]
pub struct RouteDocument {
    pub format: RouteFormat,
    pub path: PathBuf,
    source: String,
    waypoints: Vec<Waypoint>,
}

impl RouteDocument {
    pub fn load(path: &Path) -> Result<Self, RouteFileError> {
        let format = RouteFormat::from_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| RouteFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(format, path, source)
    }

    pub fn parse(format: RouteFormat, path: &Path, source: String) -> Result<Self, RouteFileError> {
        let waypoints = match format {
            RouteFormat::Mission => read_mission(&source)?,
            RouteFormat::Json => serde_json::from_str::<JsonRoute>(&source)?.waypoints,
        };
        Ok(Self {
            format,
            path: path.to_path_buf(),
            source,
            waypoints,
        })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Renders the route in `format` with every waypoint altitude taken from `plan`.
    pub fn render(&self, format: RouteFormat, plan: &RoutePlan) -> Result<String, RouteFileError> {
        match (self.format, format) {
            (RouteFormat::Mission, RouteFormat::Mission) => write_mission(&self.source, plan),
            (_, RouteFormat::Json) => {
                let waypoints = self
                    .waypoints
                    .iter()
                    .map(|waypoint| {
                        let altitude = plan.altitude_for(waypoint.number).ok_or_else(|| {
                            PlanError::InvalidRoute(format!(
                                "waypoint #{} has no planned altitude",
                                waypoint.number
                            ))
                        })?;
                        Ok(Waypoint {
                            altitude,
                            ..waypoint.clone()
                        })
                    })
                    .collect::<Result<Vec<_>, RouteFileError>>()?;
                Ok(serde_json::to_string_pretty(&JsonRoute { waypoints })?)
            }
            (RouteFormat::Json, RouteFormat::Mission) => Err(RouteFileError::UnknownFormat(self.path.clone())),
        }
    }

    pub fn save(&self, path: &Path, plan: &RoutePlan) -> Result<(), RouteFileError> {
        let rendered = self.render(RouteFormat::from_path(path)?, plan)?;
        std::fs::write(path, rendered).map_err(|source| RouteFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
