//! Multi-stop itinerary assembly.
//!
//! An itinerary visits an ordered list of waypoints. Each consecutive pair
//! becomes one leg: both endpoints are snapped onto the network, attached
//! through a fresh request-scoped overlay, and routed with the budgeted
//! λ-sweep. Legs are then concatenated into two tracks, the recommended
//! (best within budget) and the shortest (baseline).

use geo::{Distance, Euclidean, Point};
use log::warn;
use serde::Serialize;
use serde_json::json;

use crate::model::network::RouteGraph;
use crate::model::projection::Projection;
use crate::model::spatial::{EdgeSpatialIndex, SnappedEdge};
use crate::routing::overlay::{OverlayNode, SearchGraph};
use crate::routing::sweep::{SweepConfig, TraversedEdge, lambda_sweep};
use crate::{Error, NodeId, VIRTUAL_END_ID, VIRTUAL_START_ID, WALK_MINUTES_PER_KM};

/// An ordered stop of the itinerary, in geographic coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    #[serde(rename = "lng")]
    pub lon: f64,
}

/// One assembled track: concatenated legs with aggregate statistics, the
/// stops it visits and a geographic polyline in `[lat, lon]` order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTrack {
    pub distance_km: f64,
    pub duration_min: u32,
    /// Length-weighted average composite score, scaled to 0..100.
    pub score: f64,
    pub polyline: Vec<[f64; 2]>,
    pub stops: Vec<Waypoint>,
}

/// The two tracks of one itinerary.
#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub recommended: RouteTrack,
    pub shortest: RouteTrack,
}

impl Itinerary {
    /// Both tracks as a GeoJSON feature collection, coordinates in
    /// `[lon, lat]` order.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let feature = |kind: &str, track: &RouteTrack| {
            let line: geo::LineString<f64> = track
                .polyline
                .iter()
                .map(|p| geo::coord! { x: p[1], y: p[0] })
                .collect();
            let properties = json!({
                "kind": kind,
                "distanceKm": track.distance_km,
                "durationMin": track.duration_min,
                "score": track.score,
            });
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&line))),
                id: None,
                properties: properties.as_object().cloned(),
                foreign_members: None,
            }
        };
        geojson::FeatureCollection {
            bbox: None,
            features: vec![
                feature("recommended", &self.recommended),
                feature("shortest", &self.shortest),
            ],
            foreign_members: None,
        }
    }
}

/// Consecutive geographic points closer than this are merged when
/// concatenating legs.
const JOIN_EPS_M: f64 = 10.0;
/// Within a leg, vertices closer than this to the previous one are dropped.
const DUP_EPS_M: f64 = 0.5;

struct TrackBuilder<'p> {
    projection: &'p dyn Projection,
    length_m: f64,
    score_len_sum: f64,
    polyline: Vec<[f64; 2]>,
}

impl<'p> TrackBuilder<'p> {
    fn new(projection: &'p dyn Projection) -> Self {
        Self {
            projection,
            length_m: 0.0,
            score_len_sum: 0.0,
            polyline: Vec::new(),
        }
    }

    fn append_leg(&mut self, edges: &[TraversedEdge]) {
        let mut first_of_leg = true;
        for edge in edges {
            self.length_m += edge.length_m;
            self.score_len_sum += edge.composite_score.clamp(0.0, 1.0) * edge.length_m;
            for coord in &edge.geometry.0 {
                let (lon, lat) = self.projection.inverse(coord.x, coord.y);
                let eps = if first_of_leg { JOIN_EPS_M } else { DUP_EPS_M };
                self.push_point([lat, lon], eps);
                first_of_leg = false;
            }
        }
    }

    fn push_point(&mut self, point: [f64; 2], eps_m: f64) {
        if let Some(last) = self.polyline.last() {
            let dlat_m = (point[0] - last[0]) * 111_320.0;
            let mean_lat = ((point[0] + last[0]) / 2.0).to_radians();
            let dlon_m = (point[1] - last[1]) * 111_320.0 * mean_lat.cos();
            if dlat_m.hypot(dlon_m) < eps_m {
                return;
            }
        }
        self.polyline.push(point);
    }

    fn finish(self, stops: Vec<Waypoint>) -> RouteTrack {
        let km = self.length_m / 1000.0;
        let avg = if self.length_m > 0.0 {
            self.score_len_sum / self.length_m
        } else {
            0.0
        };
        RouteTrack {
            distance_km: (km * 100.0).round() / 100.0,
            duration_min: (km * WALK_MINUTES_PER_KM) as u32,
            score: (avg * 100.0 * 10.0).round() / 10.0,
            polyline: self.polyline,
            stops,
        }
    }
}

/// Attach a snapped waypoint to the overlay. Splitting fails when the snap
/// point coincides with an edge endpoint; in that case route from the nearer
/// endpoint node directly.
fn attach(
    overlay: &mut SearchGraph<'_>,
    snap: &SnappedEdge,
    virtual_id: NodeId,
) -> Result<OverlayNode, Error> {
    match overlay.insert_split(snap, virtual_id) {
        Ok(node) => Ok(node),
        Err(Error::DegenerateSplit(reason)) => {
            warn!("degenerate split ({reason}), routing from the nearer edge endpoint");
            let (u, v) = overlay
                .base()
                .graph()
                .edge_endpoints(snap.edge)
                .ok_or_else(|| Error::InvalidData(format!("unknown edge {:?}", snap.edge)))?;
            let geometry = &overlay.base().graph()[snap.edge].geometry;
            let (Some(first), Some(last)) = (geometry.0.first(), geometry.0.last()) else {
                return Err(Error::DegenerateSplit("edge has no usable geometry"));
            };
            let to_u = Euclidean.distance(snap.snap_point, Point::from(*first));
            let to_v = Euclidean.distance(snap.snap_point, Point::from(*last));
            Ok(OverlayNode::Base(if to_u <= to_v { u } else { v }))
        }
        Err(e) => Err(e),
    }
}

/// Route through `waypoints` in order and assemble the recommended and
/// shortest tracks.
///
/// A leg whose endpoints cannot be snapped, or that has no path, is logged
/// and skipped; the itinerary is built from the legs that succeed. At least
/// two waypoints are required, and at least one leg must succeed.
pub fn assemble_itinerary(
    graph: &RouteGraph,
    index: &EdgeSpatialIndex,
    projection: &dyn Projection,
    config: &SweepConfig,
    waypoints: &[Waypoint],
) -> Result<Itinerary, Error> {
    if waypoints.len() < 2 {
        return Err(Error::InvalidData(
            "an itinerary needs at least two waypoints".into(),
        ));
    }
    config.validate()?;

    let mut recommended = TrackBuilder::new(projection);
    let mut shortest = TrackBuilder::new(projection);
    let mut routed_legs = 0usize;

    for pair in waypoints.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);

        let comparison = (|| -> Result<_, Error> {
            let start = index.snap(Point::from(projection.project(from.lon, from.lat)))?;
            let end = index.snap(Point::from(projection.project(to.lon, to.lat)))?;

            let mut overlay = SearchGraph::new(graph);
            let source = attach(&mut overlay, &start, VIRTUAL_START_ID)?;
            let target = attach(&mut overlay, &end, VIRTUAL_END_ID)?;
            lambda_sweep(&overlay, source, target, config)
        })();

        match comparison {
            Ok(result) => {
                recommended.append_leg(&result.best.edges);
                shortest.append_leg(&result.baseline.edges);
                routed_legs += 1;
            }
            Err(e) => {
                warn!(
                    "skipping leg {} -> {}: {e}",
                    from.name.as_deref().unwrap_or("start"),
                    to.name.as_deref().unwrap_or("stop"),
                );
            }
        }
    }

    if routed_legs == 0 {
        return Err(Error::InvalidData("no leg of the itinerary is routable".into()));
    }

    // both tracks visit the same stops, everything after the start
    let stops = waypoints[1..].to_vec();
    Ok(Itinerary {
        recommended: recommended.finish(stops.clone()),
        shortest: shortest.finish(stops),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::RouteEdge;
    use crate::model::projection::LocalTangentPlane;
    use geo::line_string;
    use hashbrown::HashMap;

    fn edge(link_id: i64, length_m: f64, score: f64, geometry: geo::LineString<f64>) -> RouteEdge {
        RouteEdge {
            link_id,
            length_m,
            composite_score: score,
            component_scores: HashMap::new(),
            geometry,
        }
    }

    /// Chain 1-2-3 along the x axis in the projected plane.
    fn chain_graph() -> RouteGraph {
        let mut g = RouteGraph::new();
        g.add_link(1, 2, edge(100, 100.0, 0.5, line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]));
        g.add_link(2, 3, edge(200, 100.0, 0.5, line_string![(x: 100.0, y: 0.0), (x: 200.0, y: 0.0)]));
        g
    }

    fn waypoint_at(proj: &LocalTangentPlane, id: i64, x: f64, y: f64) -> Waypoint {
        let (lon, lat) = proj.inverse(x, y);
        Waypoint {
            id,
            name: None,
            lat,
            lon,
        }
    }

    #[test]
    fn two_waypoints_make_one_leg() {
        let g = chain_graph();
        let index = EdgeSpatialIndex::build(&g);
        let proj = LocalTangentPlane::new(0.0, 0.0);
        let waypoints = vec![
            waypoint_at(&proj, 1, 20.0, 5.0),
            waypoint_at(&proj, 2, 180.0, 5.0),
        ];

        let itinerary =
            assemble_itinerary(&g, &index, &proj, &SweepConfig::default(), &waypoints).unwrap();

        // 160 m between the two snap points
        assert!((itinerary.shortest.distance_km - 0.16).abs() < 1e-9);
        assert_eq!(itinerary.shortest.duration_min, 2);
        assert!((itinerary.shortest.score - 50.0).abs() < 1e-9);
        assert!(itinerary.recommended.polyline.len() >= 2);

        // each track carries the visited stops, start excluded
        assert_eq!(itinerary.recommended.stops.len(), 1);
        assert_eq!(itinerary.recommended.stops[0].id, 2);
        assert_eq!(itinerary.shortest.stops[0].id, 2);
    }

    #[test]
    fn track_serializes_stops_and_lng() {
        let g = chain_graph();
        let index = EdgeSpatialIndex::build(&g);
        let proj = LocalTangentPlane::new(0.0, 0.0);
        let waypoints = vec![
            waypoint_at(&proj, 1, 20.0, 5.0),
            waypoint_at(&proj, 2, 180.0, 5.0),
        ];
        let itinerary =
            assemble_itinerary(&g, &index, &proj, &SweepConfig::default(), &waypoints).unwrap();

        let json = serde_json::to_value(&itinerary.recommended).unwrap();
        assert!(json["stops"][0]["lng"].is_number());
        assert!(json["stops"][0]["lat"].is_number());
        assert!(json["stops"][0].get("lon").is_none());
        assert!(json["distanceKm"].is_number());
    }

    #[test]
    fn endpoint_snap_routes_from_the_node_itself() {
        let g = chain_graph();
        let mut overlay = SearchGraph::new(&g);
        let first_edge = g.graph().edge_indices().next().unwrap();
        // snap exactly on node 1, where splitting is degenerate
        let snap = SnappedEdge {
            edge: first_edge,
            snap_point: Point::new(0.0, 0.0),
            distance_m: 0.0,
        };
        let node = attach(&mut overlay, &snap, -1_000).unwrap();
        assert_eq!(node, overlay.base_node(1).unwrap());
        // the edge itself is still intact in the overlay
        let v = overlay.base_node(2).unwrap();
        assert_eq!(overlay.edges_between(node, v).len(), 1);
    }

    #[test]
    fn single_waypoint_is_an_error() {
        let g = chain_graph();
        let index = EdgeSpatialIndex::build(&g);
        let proj = LocalTangentPlane::new(0.0, 0.0);
        let waypoints = vec![waypoint_at(&proj, 1, 20.0, 5.0)];
        assert!(matches!(
            assemble_itinerary(&g, &index, &proj, &SweepConfig::default(), &waypoints),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn unreachable_stop_is_skipped() {
        let g = chain_graph();
        let index = EdgeSpatialIndex::build(&g);
        let proj = LocalTangentPlane::new(0.0, 0.0);
        // third stop is far outside the snap radius, so leg 2 is dropped
        let waypoints = vec![
            waypoint_at(&proj, 1, 20.0, 5.0),
            waypoint_at(&proj, 2, 180.0, 5.0),
            waypoint_at(&proj, 3, 50_000.0, 50_000.0),
        ];

        let itinerary =
            assemble_itinerary(&g, &index, &proj, &SweepConfig::default(), &waypoints).unwrap();
        assert!((itinerary.shortest.distance_km - 0.16).abs() < 1e-9);
    }

    #[test]
    fn no_routable_leg_is_an_error() {
        let g = chain_graph();
        let index = EdgeSpatialIndex::build(&g);
        let proj = LocalTangentPlane::new(0.0, 0.0);
        let waypoints = vec![
            waypoint_at(&proj, 1, 50_000.0, 50_000.0),
            waypoint_at(&proj, 2, 60_000.0, 50_000.0),
        ];
        assert!(matches!(
            assemble_itinerary(&g, &index, &proj, &SweepConfig::default(), &waypoints),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn geojson_has_both_tracks() {
        let g = chain_graph();
        let index = EdgeSpatialIndex::build(&g);
        let proj = LocalTangentPlane::new(0.0, 0.0);
        let waypoints = vec![
            waypoint_at(&proj, 1, 20.0, 5.0),
            waypoint_at(&proj, 2, 180.0, 5.0),
        ];
        let itinerary =
            assemble_itinerary(&g, &index, &proj, &SweepConfig::default(), &waypoints).unwrap();

        let collection = itinerary.to_geojson();
        assert_eq!(collection.features.len(), 2);
        let kinds: Vec<&str> = collection
            .features
            .iter()
            .filter_map(|f| f.properties.as_ref()?.get("kind")?.as_str())
            .collect();
        assert_eq!(kinds, vec!["recommended", "shortest"]);
    }
}
