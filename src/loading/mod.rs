//! Ingestion of scored link CSVs and the optional shading override table
//! into a season-specific [`RouteGraph`].

pub mod links;
pub mod shading;

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use hashbrown::HashMap;
use log::info;

use crate::Error;
use crate::model::network::{RouteEdge, RouteGraph};
use crate::model::projection::Projection;
use crate::model::scoring::SeasonalScoringModel;
use crate::model::season::Season;

pub use shading::load_shading;

/// Build the routable graph for one season.
///
/// Link geometries are projected onto the metric plane, every link is scored
/// with the season's weighting, and the shading override for the time bucket
/// at `now` is applied when a shading table is provided.
///
/// # Errors
///
/// Returns an error when a file cannot be read or its header is unusable;
/// individual bad rows are skipped with a warning instead.
pub fn build_route_graph(
    links_path: &Path,
    shading_path: Option<&Path>,
    projection: &dyn Projection,
    season: Season,
    now: DateTime<FixedOffset>,
) -> Result<RouteGraph, Error> {
    info!("reading scored links from {}", links_path.display());
    let (links, available) = links::read_links(links_path, projection)?;

    let column = season.shading_column(now);
    let shading = match (shading_path, column.as_deref()) {
        (Some(path), Some(_)) => {
            info!(
                "reading shading table {} (column {})",
                path.display(),
                column.as_deref().unwrap_or_default()
            );
            load_shading(path, column.as_deref())?
        }
        _ => HashMap::new(),
    };

    let model = SeasonalScoringModel::new(season, &available, shading);
    let mut graph = RouteGraph::new();
    for link in links {
        let score = model.score(link.link_id, &link.raw);
        graph.add_link(
            link.u,
            link.v,
            RouteEdge::new(link.link_id, link.length_m, score, link.geometry),
        );
    }

    info!(
        "{season} graph built: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}
