//! Node registry
//!
//! Insertion-ordered store of every network participant. Iteration order is
//! stable between mutations, which the incremental graph refresh relies on.

use crate::{NetworkError, Node, NodeId, Result};
use nalgebra::Vector3;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Registering an id twice is an error.
    pub fn register(&mut self, node: Node) -> Result<NodeId> {
        let id = node.id;
        if self.index.contains_key(&id) {
            return Err(NetworkError::DuplicateNode(id));
        }
        debug!("Registered {} ({:?}) as {}", node.name, node.kind, id);
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    /// Remove a node, keeping the order of the remaining ones.
    pub fn unregister(&mut self, id: NodeId) -> Result<Node> {
        let slot = self.index.remove(&id).ok_or(NetworkError::NodeNotFound(id))?;
        let node = self.nodes.remove(slot);
        for (i, n) in self.nodes.iter().enumerate().skip(slot) {
            self.index.insert(n.id, i);
        }
        debug!("Unregistered {}", node.name);
        Ok(node)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.index
            .get(&id)
            .map(|&i| &self.nodes[i])
            .ok_or(NetworkError::NodeNotFound(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.nodes[i]),
            None => Err(NetworkError::NodeNotFound(id)),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn position(&self, id: NodeId) -> Result<Vector3<f64>> {
        self.get(id).map(|n| n.position)
    }

    /// Name of the body the node is near.
    pub fn body(&self, id: NodeId) -> Result<&str> {
        self.get(id).map(|n| n.body.as_str())
    }

    /// Nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Command-capable nodes plus every ground station.
    pub fn command_stations(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_command_station())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_powered(&mut self, id: NodeId, powered: bool) -> Result<()> {
        self.get_mut(id)?.powered = powered;
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, position: Vector3<f64>) -> Result<()> {
        self.get_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_local_control(&mut self, id: NodeId, local: bool) -> Result<()> {
        self.get_mut(id)?.local_control = local;
        Ok(())
    }
}
