//! Bounded event ring and topology events
//!
//! Events are written by the tick that causes them and drained by whoever
//! embeds the network. A full ring rejects new events instead of blocking.

use crate::{Link, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-capacity FIFO of events.
#[derive(Debug, Clone)]
pub struct EventRing<T> {
    buf: VecDeque<T>,
    capacity: usize,
    dropped: u64,
}

impl<T> EventRing<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            dropped: 0,
        }
    }

    /// Push an event. Returns false when the ring is full.
    pub fn push(&mut self, event: T) -> bool {
        if self.buf.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.buf.push_back(event);
        true
    }

    /// Raise the capacity to at least `capacity`; never shrinks.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.capacity = self.capacity.max(capacity);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop_front()
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.buf.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Events rejected because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Topology change notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetworkEvent {
    NodeRegistered { node: NodeId },
    NodeUnregistered { node: NodeId },
    /// Fired once per link on every rebuild, including links that already existed
    LinkAdded { link: Link },
    LinkRemoved { link: Link },
    RoutesRefreshed {
        node: NodeId,
        route_count: usize,
        /// Delay of the best route, None when unreachable
        best_delay: Option<f64>,
    },
}
