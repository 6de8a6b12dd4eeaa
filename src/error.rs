use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no path found between nodes {from_node} and {to_node}")]
    NoPathFound { from_node: NodeId, to_node: NodeId },
    #[error("no edge within {radius_m} m of the query point")]
    NoNearbyEdge { radius_m: f64 },
    #[error("spatial index is empty")]
    EmptySpatialIndex,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("geometry parse failure: {0}")]
    GeometryParse(String),
    #[error("degenerate split: {0}")]
    DegenerateSplit(&'static str),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
