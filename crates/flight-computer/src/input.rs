//! Control signal snapshot

use crate::AttitudeMode;
use relay_network::NodeId;
use serde::{Deserialize, Serialize};

/// Attitude hold requested from the host's steering loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeRequest {
    pub mode: AttitudeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
}

/// One frame of control input. Axes are in [-1, 1], throttles in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlInput {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub throttle: f64,
    pub wheel_steer: f64,
    pub wheel_throttle: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attitude: Option<AttitudeRequest>,
}

impl ControlInput {
    pub fn with_throttle(throttle: f64) -> Self {
        Self {
            throttle,
            ..Default::default()
        }
    }

    /// Clear pitch, yaw and roll.
    pub fn zero_attitude_axes(&mut self) {
        self.pitch = 0.0;
        self.yaw = 0.0;
        self.roll = 0.0;
    }
}
