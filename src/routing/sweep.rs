//! Budgeted multi-objective route search (λ-sweep).
//!
//! A family of single-criterion Dijkstra runs under costs
//! `length / L_ref + λ * (1 - score)^p` approximates the Pareto frontier
//! between distance and environmental score; a detour budget derived from
//! the shortest path keeps the winner's length acceptable.

use geo::LineString;
use itertools::Itertools;
use log::{debug, info};

use crate::model::network::RouteEdge;
use crate::model::season::clamp01;
use crate::routing::dijkstra::shortest_path;
use crate::routing::overlay::{OverlayNode, SearchGraph};
use crate::{Error, LinkId, NodeId};

/// Score ties within this bound are broken by length.
const SCORE_EPS: f64 = 1e-12;

/// Configuration of the λ-sweep. Validated eagerly at construction.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum allowed ratio of a candidate's length to the shortest length.
    pub detour_ratio: f64,
    /// Sweep values; 0 is implicitly the baseline weighting.
    pub lambdas: Vec<f64>,
    /// Exponent applied to `(1 - score)` in the combined cost.
    pub cost_power: f64,
    /// Length-normalization reference; median positive edge length when
    /// unset.
    pub length_ref: Option<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            detour_ratio: 1.2,
            lambdas: vec![0.0, 10.0, 30.0, 60.0, 100.0, 150.0],
            cost_power: 2.0,
            length_ref: None,
        }
    }
}

impl SweepConfig {
    pub fn new(detour_ratio: f64, lambdas: Vec<f64>, cost_power: f64) -> Result<Self, Error> {
        let config = Self {
            detour_ratio,
            lambdas,
            cost_power,
            length_ref: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.detour_ratio >= 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "detour_ratio must be >= 1.0, got {}",
                self.detour_ratio
            )));
        }
        if !(self.cost_power > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "cost_power must be > 0, got {}",
                self.cost_power
            )));
        }
        if self.lambdas.iter().any(|l| *l < 0.0 || !l.is_finite()) {
            return Err(Error::InvalidConfiguration(
                "lambda values must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// One traversed edge of a found path, oriented along the travel direction.
#[derive(Debug, Clone)]
pub struct TraversedEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub link_id: LinkId,
    pub length_m: f64,
    pub composite_score: f64,
    /// Projected geometry, re-oriented to run `from -> to`.
    pub geometry: LineString<f64>,
}

/// A found path with its aggregate statistics.
#[derive(Debug, Clone)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<TraversedEdge>,
    pub length_m: f64,
    pub avg_score: f64,
    /// λ that produced this path; `None` for the distance-only baseline.
    pub lambda: Option<f64>,
}

/// Baseline (shortest by length), best (highest score within budget) and the
/// length budget that constrained the sweep.
#[derive(Debug, Clone)]
pub struct RouteComparison {
    pub baseline: PathResult,
    pub best: PathResult,
    pub budget_len_m: f64,
}

/// Total length and length-weighted average score of an edge list. Scores
/// are clamped to `[0, 1]` before averaging; an empty list yields zeros.
#[must_use]
pub fn route_stats(edges: &[TraversedEdge]) -> (f64, f64) {
    let mut total_len = 0.0;
    let mut score_len_sum = 0.0;
    for e in edges {
        total_len += e.length_m;
        score_len_sum += clamp01(e.composite_score) * e.length_m;
    }
    let avg = if total_len > 0.0 {
        score_len_sum / total_len
    } else {
        0.0
    };
    (total_len, avg)
}

/// Resolve a node path into traversed edges. Where parallel edges exist
/// between a consecutive node pair, the one with the minimum weight under
/// `metric` is selected; the first edge encountered wins ties.
fn extract_edges<F>(graph: &SearchGraph<'_>, nodes: &[OverlayNode], metric: F) -> Vec<TraversedEdge>
where
    F: Fn(&RouteEdge) -> f64,
{
    let mut edges = Vec::with_capacity(nodes.len().saturating_sub(1));
    for (&a, &b) in nodes.iter().tuple_windows() {
        let candidates = graph.edges_between(a, b);
        let Some((edge, forward)) = candidates
            .iter()
            .copied()
            .reduce(|best, cand| if metric(cand.0) < metric(best.0) { cand } else { best })
        else {
            log::warn!(
                "no edge between consecutive path nodes {} and {}",
                graph.node_id(a),
                graph.node_id(b)
            );
            continue;
        };
        let geometry = if forward {
            edge.geometry.clone()
        } else {
            LineString::new(edge.geometry.0.iter().rev().copied().collect())
        };
        edges.push(TraversedEdge {
            from: graph.node_id(a),
            to: graph.node_id(b),
            link_id: edge.link_id,
            length_m: edge.length_m,
            composite_score: edge.composite_score,
            geometry,
        });
    }
    edges
}

/// Run the budgeted λ-sweep between two overlay nodes.
///
/// The baseline is the shortest path by raw length; every λ produces a
/// candidate under the combined cost, and the best candidate within
/// `budget = baseline_length * detour_ratio` wins. The baseline itself is
/// the λ=0 candidate, so `best` never scores below it and never exceeds the
/// budget.
pub fn lambda_sweep(
    graph: &SearchGraph<'_>,
    source: OverlayNode,
    target: OverlayNode,
    config: &SweepConfig,
) -> Result<RouteComparison, Error> {
    config.validate()?;

    let length_ref = config
        .length_ref
        .or_else(|| graph.median_positive_length())
        .ok_or_else(|| Error::InvalidData("no positive edge lengths in graph".into()))?;

    let base_nodes = shortest_path(graph, source, target, |e| e.length_m).ok_or_else(|| {
        Error::NoPathFound {
            from_node: graph.node_id(source),
            to_node: graph.node_id(target),
        }
    })?;
    let base_edges = extract_edges(graph, &base_nodes, |e| e.length_m);
    let (base_len, base_score) = route_stats(&base_edges);
    let budget_len_m = base_len * config.detour_ratio;

    info!(
        "baseline: {:.1} m, score {:.3}; budget {:.1} m",
        base_len, base_score, budget_len_m
    );

    let node_ids = |nodes: &[OverlayNode]| -> Vec<NodeId> {
        nodes.iter().map(|&n| graph.node_id(n)).collect()
    };

    let mut best = PathResult {
        nodes: node_ids(&base_nodes),
        edges: base_edges.clone(),
        length_m: base_len,
        avg_score: base_score,
        lambda: Some(0.0),
    };

    for &lambda in &config.lambdas {
        let cost = |e: &RouteEdge| {
            e.length_m / length_ref
                + lambda * (1.0 - clamp01(e.composite_score)).powf(config.cost_power)
        };
        let Some(nodes) = shortest_path(graph, source, target, &cost) else {
            debug!("lambda {lambda}: no path, skipped");
            continue;
        };
        let edges = extract_edges(graph, &nodes, &cost);
        let (len, score) = route_stats(&edges);

        let within_budget = len <= budget_len_m;
        let improves = score > best.avg_score
            || ((score - best.avg_score).abs() < SCORE_EPS && len < best.length_m);
        if within_budget && improves {
            debug!("lambda {lambda}: new best, {len:.1} m, score {score:.3}");
            best = PathResult {
                nodes: node_ids(&nodes),
                edges,
                length_m: len,
                avg_score: score,
                lambda: Some(lambda),
            };
        }
    }

    info!(
        "best: lambda {:?}, {:.1} m, score {:.3}",
        best.lambda, best.length_m, best.avg_score
    );

    Ok(RouteComparison {
        baseline: PathResult {
            nodes: node_ids(&base_nodes),
            edges: base_edges,
            length_m: base_len,
            avg_score: base_score,
            lambda: None,
        },
        best,
        budget_len_m,
    })
}
