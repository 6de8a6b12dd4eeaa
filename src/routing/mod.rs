//! Route search: request-scoped graph overlay, Dijkstra, the budgeted
//! λ-sweep and multi-stop itinerary assembly.

pub mod dijkstra;
pub mod itinerary;
pub mod overlay;
pub mod sweep;

pub use itinerary::{Itinerary, RouteTrack, Waypoint, assemble_itinerary};
pub use overlay::{OverlayNode, SearchGraph};
pub use sweep::{PathResult, RouteComparison, SweepConfig, TraversedEdge, lambda_sweep, route_stats};
