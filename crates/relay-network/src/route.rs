//! Routes from a node to a command station

use crate::{Link, NodeId};
use serde::{Deserialize, Serialize};

/// Shortest path result for one start/goal pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub start: NodeId,
    pub goal: NodeId,
    /// Consecutive links; empty when start == goal
    pub links: Vec<Link>,
    /// Sum of hop distances (m)
    pub length: f64,
    /// One-way signal delay (s)
    pub delay: f64,
    pub exists: bool,
}

impl Route {
    /// Node ids along the route, start first.
    pub fn hops(&self) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(self.links.len() + 1);
        nodes.push(self.start);
        nodes.extend(self.links.iter().map(|l| l.target));
        nodes
    }
}
