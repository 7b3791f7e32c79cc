//! Directed communication links

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Antenna pairing that carries a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkClass {
    /// Omni on both ends
    Omni,
    /// At least one end is an aimed dish
    Directional,
}

/// A directed link from `source` to `target`.
///
/// Two links are equal when all four fields match. Distance is not part of
/// the link; it is asked of the oracle whenever a path is costed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub class: LinkClass,
    /// Index of the antenna on the source node that carries the link
    pub port: usize,
}

impl Link {
    pub fn new(source: NodeId, target: NodeId, class: LinkClass, port: usize) -> Self {
        Self {
            source,
            target,
            class,
            port,
        }
    }
}
