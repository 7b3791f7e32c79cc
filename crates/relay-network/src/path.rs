//! Shortest-path search
//!
//! Thin layer over petgraph's A*: the caller supplies the graph view (which
//! decides the neighbours), a per-edge cost and an admissible heuristic.

use crate::{Link, NodeId};
use petgraph::algo::astar;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{IntoEdges, Visitable};
use std::hash::Hash;

/// Directed relay graph. Node weights are ids, edge weights are links.
pub type RelayGraph = StableDiGraph<NodeId, Link>;

/// Cheapest path from `start` to `goal` as (cost, nodes including both ends).
pub fn shortest_path<G, C, H>(
    graph: G,
    start: G::NodeId,
    goal: G::NodeId,
    mut edge_cost: C,
    heuristic: H,
) -> Option<(f64, Vec<G::NodeId>)>
where
    G: IntoEdges + Visitable,
    G::NodeId: Eq + Hash,
    C: FnMut(G::EdgeRef) -> f64,
    H: FnMut(G::NodeId) -> f64,
{
    astar(graph, start, |n| n == goal, |e| edge_cost(e).max(0.0), heuristic)
}

/// Links between consecutive path nodes, None if any hop has no edge.
pub fn links_along(graph: &RelayGraph, nodes: &[NodeIndex]) -> Option<Vec<Link>> {
    nodes
        .windows(2)
        .map(|pair| {
            graph
                .find_edge(pair[0], pair[1])
                .and_then(|e| graph.edge_weight(e))
                .cloned()
        })
        .collect()
}
