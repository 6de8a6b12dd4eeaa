//! Data model for seasonal pedestrian routing.
//!
//! Contains the season profiles, the scoring model that turns raw link
//! attributes into a composite desirability score, the routable street
//! multigraph, the edge spatial index and the projection seam.

pub mod network;
pub mod projection;
pub mod scoring;
pub mod season;
pub mod spatial;

pub use network::{RouteEdge, RouteGraph, RouteNode};
pub use projection::{LocalTangentPlane, Projection};
pub use scoring::{EdgeScore, RawComponents, SeasonalScoringModel};
pub use season::{Component, Season, clamp01};
pub use spatial::{EdgeSpatialIndex, SnappedEdge};
