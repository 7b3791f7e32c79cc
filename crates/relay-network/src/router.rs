//! Router: graph builder, path finder and route cache
//!
//! Links live in a dense petgraph arena; each node id is mapped to its
//! `NodeIndex` once, at registration. Per step only a slice of the registry
//! is rebuilt, so the whole graph turns over once per refresh window:
//!
//! - `rebuild_links` diffs the oracle's answers against the node's outgoing
//!   edges, fires "removed" for the vanished ones, then clears and fires
//!   "added" for every current link (unchanged ones included)
//! - `find_routes` runs A* from the node to every command station through
//!   powered intermediate nodes and caches the existing routes by length
//! - `current_delay` reads the cache; no route means infinite delay

use crate::path::{self, RelayGraph};
use crate::{
    EventRing, Link, LinkOracle, NetworkError, NetworkEvent, NetworkSettings, NetworkSnapshot,
    Node, NodeId, NodeRegistry, Result, Route,
};
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{EdgeRef, NodeFiltered};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Delay and reachability of a node at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStatus {
    /// One-way delay to the nearest command station (s); infinite when unreachable
    pub delay: f64,
    pub connected: bool,
    pub local_control: bool,
    pub powered: bool,
}

impl SignalStatus {
    /// Operator on board, powered.
    pub fn local() -> Self {
        Self {
            delay: 0.0,
            connected: true,
            local_control: true,
            powered: true,
        }
    }

    /// Remote, powered and reachable with the given delay.
    pub fn remote(delay: f64) -> Self {
        Self {
            delay,
            connected: delay.is_finite(),
            local_control: false,
            powered: true,
        }
    }

    /// Remote with no route.
    pub fn disconnected() -> Self {
        Self::remote(f64::INFINITY)
    }

    pub fn with_power(mut self, powered: bool) -> Self {
        self.powered = powered;
        self
    }

    /// Whether operator input may reach the node right now.
    pub fn input_allowed(&self) -> bool {
        self.local_control || (self.powered && self.connected)
    }
}

pub struct Router {
    settings: NetworkSettings,
    graph: RelayGraph,
    index: HashMap<NodeId, NodeIndex>,
    routes: HashMap<NodeId, Vec<Route>>,
    tick: u64,
    cursor: usize,
    events: EventRing<NetworkEvent>,
}

impl Router {
    pub fn new(settings: NetworkSettings) -> Self {
        let events = EventRing::new(settings.event_capacity);
        Self {
            settings,
            graph: RelayGraph::default(),
            index: HashMap::new(),
            routes: HashMap::new(),
            tick: 0,
            cursor: 0,
            events,
        }
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    fn emit(&mut self, event: NetworkEvent) {
        if !self.events.push(event) {
            debug!("Network event ring full, event dropped");
        }
    }

    /// Make room for one full rebuild on top of the configured capacity:
    /// every current link removed, every ordered pair linked, one route
    /// notification per node.
    fn size_events_for(&mut self, count: usize) {
        let full_rebuild = self.graph.edge_count() + count * count.saturating_sub(1) + count;
        self.events
            .ensure_capacity(self.settings.event_capacity + full_rebuild);
    }

    fn ensure_node(&mut self, id: NodeId) -> NodeIndex {
        if let Some(&ix) = self.index.get(&id) {
            return ix;
        }
        let ix = self.graph.add_node(id);
        self.index.insert(id, ix);
        ix
    }

    /// Allocate the node's link set.
    pub fn on_register(&mut self, node: &Node) {
        self.ensure_node(node.id);
        info!("Router tracking {} ({})", node.name, node.id);
        self.emit(NetworkEvent::NodeRegistered { node: node.id });
    }

    /// Purge the node, its links in both directions and any cached route through it.
    pub fn on_unregister(&mut self, id: NodeId) {
        let Some(ix) = self.index.remove(&id) else {
            return;
        };
        let incident: Vec<Link> = self
            .graph
            .edges_directed(ix, Direction::Outgoing)
            .chain(self.graph.edges_directed(ix, Direction::Incoming))
            .map(|e| e.weight().clone())
            .collect();
        self.graph.remove_node(ix);
        for link in incident {
            self.emit(NetworkEvent::LinkRemoved { link });
        }

        self.routes.remove(&id);
        for routes in self.routes.values_mut() {
            routes.retain(|r| r.goal != id && !r.links.iter().any(|l| l.target == id));
        }
        info!("Router dropped {}", id);
        self.emit(NetworkEvent::NodeUnregistered { node: id });
    }

    /// Rebuild a slice of the registry. Returns how many nodes were refreshed.
    pub fn refresh_tick<O>(&mut self, registry: &NodeRegistry, oracle: &O) -> usize
    where
        O: LinkOracle + ?Sized,
    {
        let count = registry.len();
        if count == 0 {
            return 0;
        }
        self.size_events_for(count);
        let window = self.settings.refresh_window.max(1);
        let baseline = count / window;
        let remainder = count - baseline * window;
        let take = baseline + usize::from(self.tick % (window as u64) < remainder as u64);
        self.tick = self.tick.wrapping_add(1);

        self.cursor %= count;
        let batch: Vec<NodeId> = registry.ids().skip(self.cursor).take(take).collect();
        for id in &batch {
            if let Err(e) = self.refresh_node(*id, registry, oracle) {
                warn!("Refresh of {} failed: {}", id, e);
            }
        }
        self.cursor = (self.cursor + take) % count;
        batch.len()
    }

    /// Rebuild links for every node, then routes for every node.
    pub fn refresh_all<O>(&mut self, registry: &NodeRegistry, oracle: &O) -> Result<()>
    where
        O: LinkOracle + ?Sized,
    {
        let ids: Vec<NodeId> = registry.ids().collect();
        self.size_events_for(ids.len());
        for id in &ids {
            self.rebuild_links(*id, registry, oracle)?;
        }
        for id in &ids {
            self.find_routes(*id, registry, oracle)?;
        }
        Ok(())
    }

    fn refresh_node<O>(&mut self, id: NodeId, registry: &NodeRegistry, oracle: &O) -> Result<()>
    where
        O: LinkOracle + ?Sized,
    {
        self.rebuild_links(id, registry, oracle)?;
        self.find_routes(id, registry, oracle)?;
        Ok(())
    }

    /// Replace the node's outgoing links with the oracle's current answers.
    pub fn rebuild_links<O>(&mut self, id: NodeId, registry: &NodeRegistry, oracle: &O) -> Result<()>
    where
        O: LinkOracle + ?Sized,
    {
        let source = registry.get(id)?;
        let from = self.ensure_node(id);

        let current: Vec<Link> = registry
            .iter()
            .filter(|other| other.id != id)
            .filter(|other| oracle.has_line_of_sight(source, other))
            .filter_map(|other| oracle.link(source, other))
            .collect();

        let previous: Vec<(petgraph::stable_graph::EdgeIndex, Link)> = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .map(|e| (e.id(), e.weight().clone()))
            .collect();

        for (_, link) in previous.iter().filter(|(_, l)| !current.contains(l)) {
            debug!("Link lost {} -> {}", link.source, link.target);
            self.emit(NetworkEvent::LinkRemoved { link: link.clone() });
        }
        for (edge, _) in previous {
            self.graph.remove_edge(edge);
        }

        for link in current {
            let to = self.ensure_node(link.target);
            self.graph.add_edge(from, to, link.clone());
            self.emit(NetworkEvent::LinkAdded { link });
        }
        Ok(())
    }

    /// Route to every command station and ground station, cached shortest first.
    pub fn find_routes<O>(&mut self, id: NodeId, registry: &NodeRegistry, oracle: &O) -> Result<&[Route]>
    where
        O: LinkOracle + ?Sized,
    {
        let goals: Vec<NodeId> = registry
            .command_stations()
            .map(|n| n.id)
            .filter(|goal| *goal != id)
            .collect();
        self.find_routes_to(id, &goals, registry, oracle)
    }

    /// Route to an explicit set of candidate destinations.
    pub fn find_routes_to<O>(
        &mut self,
        id: NodeId,
        candidates: &[NodeId],
        registry: &NodeRegistry,
        oracle: &O,
    ) -> Result<&[Route]>
    where
        O: LinkOracle + ?Sized,
    {
        registry.get(id)?;
        let from = self.ensure_node(id);

        let mut found = Vec::new();
        {
            let graph = &self.graph;
            let node_of = |ix: NodeIndex| graph.node_weight(ix).and_then(|nid| registry.get(*nid).ok());
            let view = NodeFiltered::from_fn(graph, |ix: NodeIndex| {
                ix == from || node_of(ix).map_or(false, Node::is_powered)
            });

            for goal in candidates.iter().filter(|g| **g != id) {
                let (Some(&to), Ok(goal_node)) = (self.index.get(goal), registry.get(*goal)) else {
                    continue;
                };
                let hop_cost = |e: petgraph::stable_graph::EdgeReference<'_, Link>| {
                    match (registry.get(e.weight().source), registry.get(e.weight().target)) {
                        (Ok(a), Ok(b)) => oracle.distance(a, b),
                        _ => f64::INFINITY,
                    }
                };
                let estimate = |ix: NodeIndex| node_of(ix).map_or(0.0, |n| oracle.distance(n, goal_node));

                let Some((length, nodes)) = path::shortest_path(&view, from, to, hop_cost, estimate) else {
                    continue;
                };
                if !length.is_finite() {
                    continue;
                }
                if let Some(links) = path::links_along(graph, &nodes) {
                    found.push(Route {
                        start: id,
                        goal: *goal,
                        links,
                        length,
                        delay: self.settings.delay_for(length),
                        exists: true,
                    });
                }
            }
        }

        found.sort_by(|a, b| a.length.total_cmp(&b.length));
        let route_count = found.len();
        let best_delay = found.first().map(|r| r.delay);
        debug!("{} has {} routes, best delay {:?}", id, route_count, best_delay);
        self.routes.insert(id, found);
        self.emit(NetworkEvent::RoutesRefreshed {
            node: id,
            route_count,
            best_delay,
        });
        Ok(self.routes(id))
    }

    /// Cached routes, shortest first.
    pub fn routes(&self, id: NodeId) -> &[Route] {
        self.routes.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn best_route(&self, id: NodeId) -> Option<&Route> {
        self.routes(id).first()
    }

    /// Zero under local control, infinite without routes, else the best route's delay.
    pub fn current_delay(&self, node: &Node) -> f64 {
        if node.local_control {
            return 0.0;
        }
        self.best_route(node.id).map_or(f64::INFINITY, |r| r.delay)
    }

    pub fn has_connection(&self, node: &Node) -> bool {
        node.local_control || !self.routes(node.id).is_empty()
    }

    pub fn signal_status(&self, node: &Node) -> SignalStatus {
        SignalStatus {
            delay: self.current_delay(node),
            connected: self.has_connection(node),
            local_control: node.local_control,
            powered: node.is_powered(),
        }
    }

    /// Outgoing links of a node from the last rebuild.
    pub fn links(&self, id: NodeId) -> Result<Vec<&Link>> {
        let ix = self.index.get(&id).ok_or(NetworkError::NodeNotFound(id))?;
        Ok(self
            .graph
            .edges_directed(*ix, Direction::Outgoing)
            .map(|e| e.weight())
            .collect())
    }

    pub fn all_links(&self) -> impl Iterator<Item = &Link> {
        self.graph.edge_weights()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        self.events.drain()
    }

    pub fn snapshot(&self, registry: &NodeRegistry) -> NetworkSnapshot {
        NetworkSnapshot::capture(registry, self)
    }
}
