//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// What happens to throttle while the craft has no connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionLossThrottle {
    /// Cut throttle
    #[default]
    Zero,
    /// Keep the last throttle seen while connected
    Hold,
    /// Leave whatever the delay line produced
    Unmodified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightComputerSettings {
    /// Ask the host to drop time warp ahead of a due command
    pub throttle_time_warp: bool,
    pub throttle_on_connection_loss: ConnectionLossThrottle,
    /// Warp rate above which throttling kicks in
    pub time_warp_threshold: f64,
    /// Extra look-ahead (s) on top of two steps
    pub time_warp_lookahead_s: f64,
    pub event_capacity: usize,
}

impl Default for FlightComputerSettings {
    fn default() -> Self {
        Self {
            throttle_time_warp: true,
            throttle_on_connection_loss: ConnectionLossThrottle::Zero,
            time_warp_threshold: 4.0,
            time_warp_lookahead_s: 1.0,
            event_capacity: 256,
        }
    }
}
