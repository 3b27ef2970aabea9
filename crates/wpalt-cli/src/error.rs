use quick_xml::events::attributes::AttrError;
use std::path::PathBuf;
use thiserror::Error;
use wpalt_core::PlanError;

#[derive(Debug, Error)]
pub enum RouteFileError {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("mission XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("mission XML attribute error: {0}")]
    Attr(#[from] AttrError),
    #[error("failed to write mission XML: {0}")]
    Write(#[from] std::io::Error),
    #[error("rewritten mission is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("JSON route error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mission item is missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("mission item attribute `{name}` has invalid value {value:?}")]
    InvalidAttribute { name: &'static str, value: String },
    #[error("unsupported route file {0:?} (expected .mission, .xml or .json)")]
    UnknownFormat(PathBuf),
    #[error(transparent)]
    Plan(#[from] PlanError),
}
