//! District-scale pedestrian routing that trades walking distance against a
//! seasonal environmental desirability score (shade, wind shelter, points of
//! interest, seasonal amenities) under a bounded detour.
//!
//! The crate builds a routable street multigraph from scored link records,
//! snaps arbitrary coordinates onto the network through an R-tree index,
//! splits edges exactly at snap points inside a request-scoped overlay, and
//! runs a budgeted λ-sweep search that composes into multi-stop itineraries.

pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod service;

pub use error::Error;

/// External identifier of a street network node, as found in the source data.
pub type NodeId = i64;
/// External identifier of a street link; disambiguates parallel edges.
pub type LinkId = i64;

/// Radius of the neighborhood searched when snapping a point onto the
/// network. Generous for a district-scale network so the true nearest edge
/// is always among the candidates.
pub const SNAP_SEARCH_RADIUS_M: f64 = 1_000.0;

/// Sentinel identifiers reported for the per-request virtual nodes created
/// at snap points. They never enter the shared graph.
pub const VIRTUAL_START_ID: NodeId = -1_000_001;
pub const VIRTUAL_END_ID: NodeId = -1_000_002;

/// Walking pace used for duration estimates (4 km/h).
pub const WALK_MINUTES_PER_KM: f64 = 15.0;
