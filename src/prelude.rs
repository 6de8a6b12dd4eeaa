//! Convenience re-exports for downstream callers.

pub use crate::error::Error;
pub use crate::loading::build_route_graph;
pub use crate::model::{
    Component, EdgeSpatialIndex, LocalTangentPlane, Projection, RouteGraph, Season,
    SeasonalScoringModel, SnappedEdge,
};
pub use crate::routing::{
    Itinerary, PathResult, RouteComparison, SearchGraph, SweepConfig, Waypoint,
    assemble_itinerary, lambda_sweep,
};
pub use crate::service::{PlannerConfig, RoutePlanner, RouteRequest, RouteResponse};

pub use crate::{LinkId, NodeId, SNAP_SEARCH_RADIUS_M, WALK_MINUTES_PER_KM};
