//! Air Network Library - Waypoint/Route Network and Output Formats
//!
//! This library holds a small navigation network (waypoints and the routes through them) and
//! converts it between a persisted store and the formats used by pilots and aircraft GPS units.
//!
//! # Architecture
//!
//! - **[`Waypoint`]** / **[`Route`]**: Entities identified by sortable [`EntityId`]s
//! - **[`Network`]**: Aggregate owning a [`WaypointCollection`] and a [`RouteCollection`]
//! - **[`formats`]**: Tabular (CSV), exchange (GPX) and flight plan (Garmin FPL) encoders,
//!   plus the GPX decoder used for the initial import
//! - **[`schema`]**: XML Schema subset validator used on every encoded XML file
//! - **[`export`]**: Pipeline writing every format into an output directory tree
//!
//! # Import is a full replace
//!
//! [`Network::import_gpx`] discards all existing waypoints and routes. There is no merge mode.
//! Decoding happens into a fresh network which is swapped in only once decoding succeeds.
//!
//! # Relaxed invariants
//!
//! Content rules (identifier uniqueness, name lengths, route naming) are reported as
//! [`ConstraintWarning`]s rather than rejected, so permissive source data still loads.

mod collection;
mod constraint;
pub mod export;
pub mod formats;
mod id;
mod network;
mod route;
pub mod schema;
pub mod store;
pub mod utils;
mod waypoint;

// Public API exports
pub use collection::{RouteCollection, WaypointCollection};
pub use constraint::ConstraintWarning;
pub use export::{ExportOptions, ExportPolicy, ExportReport, export_network};
pub use id::{EntityId, generate_id};
pub use network::Network;
pub use route::{Route, RouteWaypoint};
pub use schema::{FormatError, SchemaError};
pub use store::NetworkStore;
pub use waypoint::Waypoint;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Route {route:?} references waypoint {waypoint_id} which is not in the network")]
    ReferentialGap { route: String, waypoint_id: EntityId },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Route {0:?} has fewer than two waypoints")]
    EmptyRoute(String),

    #[error("File name {0:?} is not a single path component")]
    InvalidFileName(String),

    #[error("File name {0:?} was already written by this export")]
    DuplicateFileName(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
