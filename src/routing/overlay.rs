//! Request-scoped overlay over the shared street graph.
//!
//! Snapping a waypoint mid-edge requires a temporary node at the snap point.
//! Instead of mutating the shared graph, each request builds a [`SearchGraph`]
//! that exposes the union of the base graph and a small set of virtual nodes
//! and split edges. Dropping the overlay discards all virtual state, on every
//! exit path including failure, and concurrent requests never share mutable
//! state.

use geo::{Coord, Distance, Euclidean, Length, LineInterpolatePoint, LineLocatePoint, LineString, Point};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::model::network::{RouteEdge, RouteGraph};
use crate::model::spatial::SnappedEdge;
use crate::{Error, NodeId};

/// Handle to a node visible through the overlay: either a node of the base
/// graph or a per-request virtual node created at a snap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayNode {
    Base(NodeIndex),
    Virtual(usize),
}

/// Split edge living only in the overlay. Geometry runs from `a` to `b`.
#[derive(Debug, Clone)]
struct SplitEdge {
    a: OverlayNode,
    b: OverlayNode,
    attrs: RouteEdge,
}

/// The base graph plus this request's virtual nodes and split edges.
pub struct SearchGraph<'g> {
    base: &'g RouteGraph,
    hidden: Vec<EdgeIndex>,
    virtual_ids: Vec<NodeId>,
    splits: Vec<Option<SplitEdge>>,
}

impl<'g> SearchGraph<'g> {
    #[must_use]
    pub fn new(base: &'g RouteGraph) -> Self {
        Self {
            base,
            hidden: Vec::new(),
            virtual_ids: Vec::new(),
            splits: Vec::new(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &'g RouteGraph {
        self.base
    }

    /// External identifier reported for an overlay node: the source-data id
    /// for base nodes, the request's sentinel id for virtual ones.
    #[must_use]
    pub fn node_id(&self, node: OverlayNode) -> NodeId {
        match node {
            OverlayNode::Base(ix) => self.base.node_id(ix),
            OverlayNode::Virtual(i) => self.virtual_ids[i],
        }
    }

    /// Overlay handle for a base node id, if it exists.
    #[must_use]
    pub fn base_node(&self, id: NodeId) -> Option<OverlayNode> {
        self.base.node_index(id).map(OverlayNode::Base)
    }

    /// Edges incident to `node`, as seen through the overlay: base edges not
    /// hidden by a split, plus this request's split edges.
    pub(crate) fn neighbors(
        &self,
        node: OverlayNode,
    ) -> impl Iterator<Item = (OverlayNode, &RouteEdge)> {
        let base_edges = match node {
            OverlayNode::Base(ix) => Some(self.base.graph().edges(ix)),
            OverlayNode::Virtual(_) => None,
        };
        base_edges
            .into_iter()
            .flatten()
            .filter(|e| !self.hidden.contains(&e.id()))
            .map(|e| (OverlayNode::Base(e.target()), e.weight()))
            .chain(self.splits.iter().filter_map(move |slot| {
                let s = slot.as_ref()?;
                if s.a == node {
                    Some((s.b, &s.attrs))
                } else if s.b == node {
                    Some((s.a, &s.attrs))
                } else {
                    None
                }
            }))
    }

    /// All visible edges between `a` and `b`, with a flag telling whether
    /// the stored geometry runs `a -> b` (`true`) or `b -> a`.
    pub(crate) fn edges_between(&self, a: OverlayNode, b: OverlayNode) -> Vec<(&RouteEdge, bool)> {
        let mut found = Vec::new();
        if let (OverlayNode::Base(a_ix), OverlayNode::Base(b_ix)) = (a, b) {
            for e in self.base.graph().edges(a_ix) {
                if e.target() != b_ix || self.hidden.contains(&e.id()) {
                    continue;
                }
                let forward = self
                    .base
                    .graph()
                    .edge_endpoints(e.id())
                    .is_some_and(|(u, _)| u == a_ix);
                found.push((e.weight(), forward));
            }
        }
        for slot in &self.splits {
            let Some(s) = slot.as_ref() else { continue };
            if s.a == a && s.b == b {
                found.push((&s.attrs, true));
            } else if s.a == b && s.b == a {
                found.push((&s.attrs, false));
            }
        }
        found
    }

    /// Visible edge attributes, for statistics over the overlay.
    pub(crate) fn edge_weights(&self) -> impl Iterator<Item = &RouteEdge> {
        self.base
            .graph()
            .edge_indices()
            .filter(|ix| !self.hidden.contains(ix))
            .map(|ix| &self.base.graph()[ix])
            .chain(self.splits.iter().filter_map(|s| s.as_ref().map(|s| &s.attrs)))
    }

    /// Median positive edge length as seen through the overlay.
    #[must_use]
    pub fn median_positive_length(&self) -> Option<f64> {
        let mut lengths: Vec<f64> = self
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

    /// Split the snapped edge at its snap point and connect a new virtual
    /// node there, reported under `virtual_id`. The original edge is hidden
    /// from this overlay only; on error nothing changes.
    ///
    /// When the snapped base edge was already split by this request (both
    /// waypoints on one edge), the nearer of its live halves is split
    /// instead.
    pub fn insert_split(
        &mut self,
        snap: &SnappedEdge,
        virtual_id: NodeId,
    ) -> Result<OverlayNode, Error> {
        let base = self.base;
        if !self.hidden.contains(&snap.edge) {
            let (u, v) = base
                .graph()
                .edge_endpoints(snap.edge)
                .ok_or_else(|| Error::InvalidData(format!("unknown edge {:?}", snap.edge)))?;
            let attrs = &base.graph()[snap.edge];
            let (first, second) = split_edge_at(attrs, snap.snap_point)?;
            self.hidden.push(snap.edge);
            Ok(self.connect_virtual(
                OverlayNode::Base(u),
                OverlayNode::Base(v),
                first,
                second,
                virtual_id,
            ))
        } else {
            let link_id = base.graph()[snap.edge].link_id;
            let slot = self
                .nearest_split_half(link_id, snap.snap_point)
                .ok_or(Error::DegenerateSplit("no live half of the split edge"))?;
            let half = self.splits[slot]
                .clone()
                .ok_or(Error::DegenerateSplit("split half already retired"))?;
            let (first, second) = split_edge_at(&half.attrs, snap.snap_point)?;
            self.splits[slot] = None;
            Ok(self.connect_virtual(half.a, half.b, first, second, virtual_id))
        }
    }

    fn connect_virtual(
        &mut self,
        a: OverlayNode,
        b: OverlayNode,
        first: RouteEdge,
        second: RouteEdge,
        virtual_id: NodeId,
    ) -> OverlayNode {
        self.virtual_ids.push(virtual_id);
        let node = OverlayNode::Virtual(self.virtual_ids.len() - 1);
        self.splits.push(Some(SplitEdge {
            a,
            b: node,
            attrs: first,
        }));
        self.splits.push(Some(SplitEdge {
            a: node,
            b,
            attrs: second,
        }));
        log::debug!(
            "split edge into halves at virtual node {virtual_id} ({} live split edges)",
            self.splits.iter().filter(|s| s.is_some()).count()
        );
        node
    }

    /// Among the live split edges derived from `link_id`, the one nearest to
    /// `point`.
    fn nearest_split_half(&self, link_id: i64, point: Point<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, slot) in self.splits.iter().enumerate() {
            let Some(s) = slot.as_ref() else { continue };
            if s.attrs.link_id != link_id {
                continue;
            }
            let Some(fraction) = s.attrs.geometry.line_locate_point(&point) else {
                continue;
            };
            let Some(on_line) = s.attrs.geometry.line_interpolate_point(fraction) else {
                continue;
            };
            let d = Euclidean.distance(on_line, point);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Cut an edge exactly at `snap_point`, which is expected to lie near its
/// geometry. The point is re-projected onto the polyline first so the cut
/// vertex is exactly on the line. Lengths are apportioned by the geometric
/// split ratio; scores are copied verbatim onto both halves.
fn split_edge_at(attrs: &RouteEdge, snap_point: Point<f64>) -> Result<(RouteEdge, RouteEdge), Error> {
    let geometry = &attrs.geometry;
    if geometry.0.len() < 2 {
        return Err(Error::DegenerateSplit("edge has no usable geometry"));
    }
    let fraction = geometry
        .line_locate_point(&snap_point)
        .ok_or(Error::DegenerateSplit("cannot project snap point onto edge"))?;
    let exact = geometry
        .line_interpolate_point(fraction)
        .ok_or(Error::DegenerateSplit("cannot interpolate split point"))?;

    let (g1, g2) = split_linestring(geometry, fraction, exact.into())
        .ok_or(Error::DegenerateSplit("snap point coincides with an edge endpoint"))?;

    let l1 = Euclidean.length(&g1);
    let l2 = Euclidean.length(&g2);
    let total = l1 + l2;
    if total <= 0.0 {
        return Err(Error::DegenerateSplit("split geometry has zero length"));
    }
    let r1 = l1 / total;

    let half = |length: f64, geometry: LineString<f64>| RouteEdge {
        link_id: attrs.link_id,
        length_m: length,
        composite_score: attrs.composite_score,
        component_scores: attrs.component_scores.clone(),
        geometry,
    };
    Ok((
        half(attrs.length_m * r1, g1),
        half(attrs.length_m * (1.0 - r1), g2),
    ))
}

/// Split a polyline into two contiguous sub-polylines at the exact point at
/// `fraction` of its length. Returns `None` when either part would be empty
/// (the point sits on an endpoint).
fn split_linestring(
    line: &LineString<f64>,
    fraction: f64,
    cut: Coord<f64>,
) -> Option<(LineString<f64>, LineString<f64>)> {
    const EPS: f64 = 1e-9;

    let coords = &line.0;
    let total = Euclidean.length(line);
    if total <= 0.0 {
        return None;
    }
    let target = fraction * total;
    if target <= EPS || target >= total - EPS {
        return None;
    }

    let mut walked = 0.0;
    for i in 0..coords.len() - 1 {
        let seg = Euclidean.distance(Point::from(coords[i]), Point::from(coords[i + 1]));
        if walked + seg < target {
            walked += seg;
            continue;
        }

        let mut first = coords[..=i].to_vec();
        if Euclidean.distance(Point::from(coords[i]), Point::from(cut)) > EPS {
            first.push(cut);
        }
        let mut second = vec![cut];
        if Euclidean.distance(Point::from(cut), Point::from(coords[i + 1])) <= EPS {
            second.pop();
        }
        second.extend_from_slice(&coords[i + 1..]);

        if first.len() < 2 || second.len() < 2 {
            return None;
        }
        return Some((LineString::new(first), LineString::new(second)));
    }
    None
}
