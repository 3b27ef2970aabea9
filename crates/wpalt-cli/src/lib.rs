//! Route file formats for the `wpalt` command.

pub mod error;
pub mod mission;
pub mod route_file;

pub use error::RouteFileError;
pub use mission::{read_mission, write_mission};
pub use route_file::{JsonRoute, RouteDocument, RouteFormat};
