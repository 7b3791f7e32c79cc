//! Relay Network - line-of-sight relay graph with propagation delay
//!
//! Maintains the communication topology between craft and ground stations:
//!
//! - Node registry (insertion ordered, stable iteration)
//! - Link oracle (line of sight, antenna range models)
//! - Directed link graph, rebuilt incrementally per node
//! - Shortest-path routing to command-capable stations
//! - Per-node route cache with light-speed signal delay
//! - Bounded event ring for topology changes

use thiserror::Error;
use uuid::Uuid;

pub mod events;
pub mod link;
pub mod node;
pub mod oracle;
pub mod path;
pub mod registry;
pub mod route;
pub mod router;
pub mod settings;
pub mod snapshot;

pub use events::{EventRing, NetworkEvent};
pub use link::{Link, LinkClass};
pub use node::{Antenna, Body, Node, NodeKind};
pub use oracle::{GeometricOracle, LinkOracle};
pub use registry::NodeRegistry;
pub use route::Route;
pub use router::{Router, SignalStatus};
pub use settings::{NetworkSettings, RangeModel};
pub use snapshot::NetworkSnapshot;

/// Stable node identity, assigned once at creation.
pub type NodeId = Uuid;

/// Relay network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Node already registered: {0}")]
    DuplicateNode(NodeId),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
