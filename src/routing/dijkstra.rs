//! Dijkstra over the request-scoped overlay graph.
//!
//! Costs are produced on demand by a caller-supplied function of the edge
//! attributes, so the λ-sweep never stores transient weights on shared
//! edges.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;

use crate::model::network::RouteEdge;
use crate::routing::overlay::{OverlayNode, SearchGraph};

#[derive(Copy, Clone)]
struct State {
    cost: f64,
    node: OverlayNode,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap)
        other.cost.total_cmp(&self.cost)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `source` to `target` under `edge_cost`, as a node
/// sequence. `None` when the two are disconnected.
pub(crate) fn shortest_path<F>(
    graph: &SearchGraph<'_>,
    source: OverlayNode,
    target: OverlayNode,
    edge_cost: F,
) -> Option<Vec<OverlayNode>>
where
    F: Fn(&RouteEdge) -> f64,
{
    let mut distances: HashMap<OverlayNode, f64> = HashMap::new();
    let mut previous: HashMap<OverlayNode, OverlayNode> = HashMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source, 0.0);
    heap.push(State {
        cost: 0.0,
        node: source,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if node == target {
            break;
        }

        // Skip if we've already found a better path
        if let Some(&best) = distances.get(&node) {
            if cost > best {
                continue;
            }
        }

        for (next, edge) in graph.neighbors(node) {
            let next_cost = cost + edge_cost(edge);

            match distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    previous.insert(next, node);
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        previous.insert(next, node);
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    }
                }
            }
        }
    }

    if !distances.contains_key(&target) {
        return None;
    }

    let mut path = vec![target];
    let mut current = target;
    while let Some(&prev) = previous.get(&current) {
        path.push(prev);
        current = prev;
    }
    if *path.last()? != source {
        return None;
    }
    path.reverse();
    Some(path)
}
