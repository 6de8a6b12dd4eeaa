//! Routable street multigraph.
//!
//! Built once per season from scored link records. Parallel edges between the
//! same node pair are kept (nearby parallel streets and split segments can
//! share endpoints) and are disambiguated by their link id.

use geo::{LineString, Point};
use hashbrown::HashMap;
use petgraph::Undirected;
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};

use crate::model::scoring::EdgeScore;
use crate::model::season::Component;
use crate::{LinkId, NodeId};

/// Street network node. Regular nodes come from the source data; virtual
/// nodes live only inside a request-scoped overlay and never appear here.
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub id: NodeId,
    pub position: Option<Point<f64>>,
}

/// Street segment with its seasonal scores and projected geometry.
#[derive(Debug, Clone)]
pub struct RouteEdge {
    pub link_id: LinkId,
    pub length_m: f64,
    pub composite_score: f64,
    /// Per-component breakdown, retained for diagnostics.
    pub component_scores: HashMap<Component, f64>,
    /// Polyline in the projected (metric) coordinate system, oriented from
    /// the stored source node to the stored target node.
    pub geometry: LineString<f64>,
}

impl RouteEdge {
    #[must_use]
    pub fn new(link_id: LinkId, length_m: f64, score: EdgeScore, geometry: LineString<f64>) -> Self {
        Self {
            link_id,
            length_m,
            composite_score: score.composite,
            component_scores: score.components,
            geometry,
        }
    }
}

/// Undirected street multigraph with a mapping from external node ids.
#[derive(Debug, Default)]
pub struct RouteGraph {
    graph: Graph<RouteNode, RouteEdge, Undirected>,
    node_ids: HashMap<NodeId, NodeIndex>,
}

impl RouteGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn graph(&self) -> &Graph<RouteNode, RouteEdge, Undirected> {
        &self.graph
    }

    #[must_use]
    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_ids.get(&id).copied()
    }

    #[must_use]
    pub fn node_id(&self, index: NodeIndex) -> NodeId {
        self.graph[index].id
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn ensure_node(&mut self, id: NodeId, position: Option<Point<f64>>) -> NodeIndex {
        match self.node_ids.get(&id) {
            Some(&index) => {
                if position.is_some() && self.graph[index].position.is_none() {
                    self.graph[index].position = position;
                }
                index
            }
            None => {
                let index = self.graph.add_node(RouteNode { id, position });
                self.node_ids.insert(id, index);
                index
            }
        }
    }

    /// Insert a scored link as a parallel-capable edge `u - v`. The edge
    /// geometry is expected to run from `u` to `v`; node positions are
    /// filled in from the geometry endpoints the first time a node is seen.
    pub fn add_link(&mut self, u: NodeId, v: NodeId, edge: RouteEdge) -> EdgeIndex {
        let start = edge.geometry.coords().next().map(|c| Point::from(*c));
        let end = edge.geometry.coords().next_back().map(|c| Point::from(*c));
        let u_ix = self.ensure_node(u, start);
        let v_ix = self.ensure_node(v, end);
        self.graph.add_edge(u_ix, v_ix, edge)
    }

    /// Median of the positive edge lengths, the default length-normalization
    /// reference of the λ-sweep.
    #[must_use]
    pub fn median_positive_length(&self) -> Option<f64> {
        let mut lengths: Vec<f64> = self
            .graph
            .edge_weights()
            .map(|e| e.length_m)
            .filter(|&l| l > 0.0)
            .collect();
        if lengths.is_empty() {
            return None;
        }
        lengths.sort_by(f64::total_cmp);
        let mid = lengths.len() / 2;
        Some(if lengths.len() % 2 == 0 {
            (lengths[mid - 1] + lengths[mid]) / 2.0
        } else {
            lengths[mid]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn plain_edge(link_id: LinkId, length_m: f64, geometry: LineString<f64>) -> RouteEdge {
        RouteEdge {
            link_id,
            length_m,
            composite_score: 0.5,
            component_scores: HashMap::new(),
            geometry,
        }
    }

    #[test]
    fn parallel_edges_are_kept() {
        let mut g = RouteGraph::new();
        let geom = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        g.add_link(1, 2, plain_edge(100, 10.0, geom.clone()));
        g.add_link(1, 2, plain_edge(101, 5.0, geom));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn node_positions_come_from_geometry_endpoints() {
        let mut g = RouteGraph::new();
        let geom = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        g.add_link(1, 2, plain_edge(100, 10.0, geom));
        let n1 = g.node_index(1).unwrap();
        let n2 = g.node_index(2).unwrap();
        assert_eq!(g.graph()[n1].position, Some(Point::new(0.0, 0.0)));
        assert_eq!(g.graph()[n2].position, Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn median_positive_length() {
        let mut g = RouteGraph::new();
        let geom = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        for (i, len) in [10.0, 20.0, 15.0].into_iter().enumerate() {
            g.add_link(i as NodeId, i as NodeId + 1, plain_edge(i as LinkId, len, geom.clone()));
        }
        assert_eq!(g.median_positive_length(), Some(15.0));
        assert_eq!(RouteGraph::new().median_positive_length(), None);
    }
}
