//! Route planning service.
//!
//! [`RoutePlanner`] is constructed explicitly with its configuration and
//! injected wherever routes are planned; there is no global instance. Season
//! graphs are built lazily on first use and memoized. Built graphs are
//! immutable and every request routes through its own overlay, so one
//! planner can serve concurrent requests; the mutex only guards the
//! memoization map.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use hashbrown::HashMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::loading::build_route_graph;
use crate::model::network::RouteGraph;
use crate::model::projection::LocalTangentPlane;
use crate::model::season::Season;
use crate::model::spatial::EdgeSpatialIndex;
use crate::routing::itinerary::{RouteTrack, Waypoint, assemble_itinerary};
use crate::routing::sweep::SweepConfig;
use crate::Error;

/// UTC+9, the timezone the network's daylight windows are defined in.
fn network_timezone() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix())
}

/// Planner configuration: data locations, sweep parameters and the
/// projection origin (defaults to the Jongno district center).
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub links_path: PathBuf,
    pub shading_path: Option<PathBuf>,
    pub sweep: SweepConfig,
    pub origin_lon: f64,
    pub origin_lat: f64,
}

impl PlannerConfig {
    #[must_use]
    pub fn new(links_path: PathBuf) -> Self {
        Self {
            links_path,
            shading_path: None,
            sweep: SweepConfig::default(),
            origin_lon: 126.98,
            origin_lat: 37.57,
        }
    }
}

/// Immutable per-season routing state: the scored graph and its edge index.
pub struct SeasonNetwork {
    pub graph: RouteGraph,
    pub index: EdgeSpatialIndex,
}

/// A route planning request: a start coordinate and the ordered places to
/// visit. When `season` is absent it is derived from the request time.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub start: StartInput,
    pub places: Vec<PlaceInput>,
    #[serde(default)]
    pub season: Option<Season>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartInput {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceInput {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// The planned itinerary in the shape the API boundary serializes; each
/// track carries the stops it visits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub season: Season,
    pub recommended: RouteTrack,
    pub shortest: RouteTrack,
}

/// Seasonal route planner over one scored link dataset.
pub struct RoutePlanner {
    config: PlannerConfig,
    projection: LocalTangentPlane,
    networks: Mutex<HashMap<Season, Arc<SeasonNetwork>>>,
}

impl RoutePlanner {
    /// Create a planner. Sweep parameters are validated eagerly so a
    /// misconfigured planner fails at startup, not per request.
    pub fn new(config: PlannerConfig) -> Result<Self, Error> {
        config.sweep.validate()?;
        let projection = LocalTangentPlane::new(config.origin_lon, config.origin_lat);
        Ok(Self {
            config,
            projection,
            networks: Mutex::new(HashMap::new()),
        })
    }

    /// The network for `season`, building and memoizing it on first use.
    pub fn network_for(
        &self,
        season: Season,
        now: DateTime<FixedOffset>,
    ) -> Result<Arc<SeasonNetwork>, Error> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|_| Error::InvalidData("season cache poisoned".into()))?;
        if let Some(network) = networks.get(&season) {
            return Ok(Arc::clone(network));
        }

        info!("building {season} network");
        let graph = build_route_graph(
            &self.config.links_path,
            self.config.shading_path.as_deref(),
            &self.projection,
            season,
            now,
        )?;
        let index = EdgeSpatialIndex::build(&graph);
        let network = Arc::new(SeasonNetwork { graph, index });
        networks.insert(season, Arc::clone(&network));
        Ok(network)
    }

    /// Plan a route for the current time.
    pub fn plan_route(&self, request: &RouteRequest) -> Result<RouteResponse, Error> {
        self.plan_route_at(request, Utc::now().with_timezone(&network_timezone()))
    }

    /// Plan a route as of `now`, which selects the season default and the
    /// shading time bucket.
    pub fn plan_route_at(
        &self,
        request: &RouteRequest,
        now: DateTime<FixedOffset>,
    ) -> Result<RouteResponse, Error> {
        if request.places.is_empty() {
            return Err(Error::InvalidData("no places to visit".into()));
        }

        let season = request.season.unwrap_or_else(|| Season::for_date(now));
        let network = self.network_for(season, now)?;

        let mut waypoints: Vec<Waypoint> = Vec::with_capacity(request.places.len() + 1);
        waypoints.push(Waypoint {
            id: 0,
            name: None,
            lat: request.start.lat,
            lon: request.start.lng,
        });
        waypoints.extend(request.places.iter().map(|p| Waypoint {
            id: p.id,
            name: p.name.clone(),
            lat: p.lat,
            lon: p.lng,
        }));

        let itinerary = assemble_itinerary(
            &network.graph,
            &network.index,
            &self.projection,
            &self.config.sweep,
            &waypoints,
        )?;

        Ok(RouteResponse {
            season,
            recommended: itinerary.recommended,
            shortest: itinerary.shortest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn links_file() -> tempfile::NamedTempFile {
        // short east-west chain near the projection origin
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "start_node_id,end_node_id,link_id,link_len_m,geometry_wkt,flower_score,tour_score\n\
             1,2,100,90.0,\"LINESTRING(126.98 37.57, 126.981 37.57)\",0.9,0.9\n\
             2,3,200,90.0,\"LINESTRING(126.981 37.57, 126.982 37.57)\",0.2,0.2\n"
        )
        .unwrap();
        file
    }

    fn noon() -> DateTime<FixedOffset> {
        network_timezone()
            .with_ymd_and_hms(2024, 7, 15, 12, 0, 0)
            .unwrap()
    }

    fn request() -> RouteRequest {
        RouteRequest {
            start: StartInput {
                lat: 37.57,
                lng: 126.9801,
            },
            places: vec![PlaceInput {
                id: 7,
                name: Some("palace".into()),
                lat: 37.57,
                lng: 126.9819,
            }],
            season: None,
        }
    }

    #[test]
    fn plans_route_end_to_end() {
        let file = links_file();
        let planner = RoutePlanner::new(PlannerConfig::new(file.path().to_path_buf())).unwrap();
        let response = planner.plan_route_at(&request(), noon()).unwrap();

        assert_eq!(response.season, Season::Summer);
        assert!(response.recommended.distance_km > 0.0);
        assert_eq!(response.recommended.stops.len(), 1);
        assert_eq!(response.recommended.stops[0].id, 7);
        assert_eq!(response.shortest.stops.len(), 1);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["recommended"]["distanceKm"].is_number());
        assert!(json["shortest"]["durationMin"].is_number());
        assert!(json["recommended"]["polyline"].is_array());
        assert!(json["recommended"]["stops"][0]["lng"].is_number());
    }

    #[test]
    fn empty_places_is_a_client_error() {
        let file = links_file();
        let planner = RoutePlanner::new(PlannerConfig::new(file.path().to_path_buf())).unwrap();
        let mut req = request();
        req.places.clear();
        assert!(matches!(
            planner.plan_route_at(&req, noon()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn season_networks_are_memoized() {
        let file = links_file();
        let planner = RoutePlanner::new(PlannerConfig::new(file.path().to_path_buf())).unwrap();
        let a = planner.network_for(Season::Winter, noon()).unwrap();
        let b = planner.network_for(Season::Winter, noon()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalid_sweep_fails_at_construction() {
        let mut config = PlannerConfig::new(PathBuf::from("unused.csv"));
        config.sweep.detour_ratio = 0.5;
        assert!(matches!(
            RoutePlanner::new(config),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
