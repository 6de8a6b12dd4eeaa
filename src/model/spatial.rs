//! R-tree index over edge geometries for nearest-edge snapping.

use geo::{BoundingRect, Distance, Euclidean, LineInterpolatePoint, LineLocatePoint, LineString, Point};
use petgraph::graph::EdgeIndex;
use rstar::{AABB, RTree, RTreeObject};

use crate::model::network::RouteGraph;
use crate::{Error, SNAP_SEARCH_RADIUS_M};

struct IndexedEdge {
    edge: EdgeIndex,
    geometry: LineString<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Result of snapping a point onto the network: the nearest edge, the exact
/// nearest point on its polyline and the distance to it.
#[derive(Debug, Clone)]
pub struct SnappedEdge {
    pub edge: EdgeIndex,
    pub snap_point: Point<f64>,
    pub distance_m: f64,
}

/// Spatial index over all edge geometries of one graph, bulk-loaded once per
/// graph instance. Queries take projected coordinates.
pub struct EdgeSpatialIndex {
    tree: RTree<IndexedEdge>,
    radius_m: f64,
}

impl EdgeSpatialIndex {
    /// Index every edge with a non-empty geometry.
    #[must_use]
    pub fn build(graph: &RouteGraph) -> Self {
        let items: Vec<IndexedEdge> = graph
            .graph()
            .edge_indices()
            .filter_map(|edge| {
                let geometry = graph.graph()[edge].geometry.clone();
                let rect = geometry.bounding_rect()?;
                Some(IndexedEdge {
                    edge,
                    geometry,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        if items.is_empty() {
            log::warn!("building an empty edge spatial index");
        }
        Self {
            tree: RTree::bulk_load(items),
            radius_m: SNAP_SEARCH_RADIUS_M,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Find the edge nearest to `point` (projected coordinates): candidates
    /// are gathered from a fixed-radius neighborhood, then the exact nearest
    /// point on each candidate polyline decides.
    pub fn snap(&self, point: Point<f64>) -> Result<SnappedEdge, Error> {
        if self.is_empty() {
            return Err(Error::EmptySpatialIndex);
        }

        let search = AABB::from_corners(
            [point.x() - self.radius_m, point.y() - self.radius_m],
            [point.x() + self.radius_m, point.y() + self.radius_m],
        );

        let mut best: Option<SnappedEdge> = None;
        for candidate in self.tree.locate_in_envelope_intersecting(&search) {
            let Some(fraction) = candidate.geometry.line_locate_point(&point) else {
                log::debug!("edge {:?}: cannot project query point", candidate.edge);
                continue;
            };
            let Some(snap_point) = candidate.geometry.line_interpolate_point(fraction) else {
                continue;
            };
            let distance_m = Euclidean.distance(snap_point, point);
            if distance_m > self.radius_m {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance_m < b.distance_m) {
                best = Some(SnappedEdge {
                    edge: candidate.edge,
                    snap_point,
                    distance_m,
                });
            }
        }

        best.ok_or(Error::NoNearbyEdge {
            radius_m: self.radius_m,
        })
    }
}
