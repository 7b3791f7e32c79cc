//! Host environment interface
//!
//! Everything a command does outside the control signal goes through
//! `VesselHost`. Defaults make a host that ignores every side effect.

use relay_network::NodeId;
use serde::{Deserialize, Serialize};

/// Side-effect sink for one craft
pub trait VesselHost {
    /// Current time-warp multiplier
    fn time_warp_rate(&self) -> f64 {
        1.0
    }

    /// Step time warp down once. Returns false when it cannot go lower.
    fn reduce_time_warp(&mut self) -> bool {
        false
    }

    /// An onboard autopilot is steering; its axes run undelayed.
    fn autopilot_engaged(&self) -> bool {
        false
    }

    /// Acceleration at full throttle (m/s^2), used to meter burns by delta-v.
    fn thrust_acceleration(&self) -> f64 {
        0.0
    }

    fn fire_action_group(&mut self, _group: &str) {}

    fn invoke_part_event(&mut self, _part: &str, _event: &str) {}

    fn set_hibernation(&mut self, _enabled: bool) {}

    fn set_target(&mut self, _target: Option<NodeId>) {}
}

/// Per-call handle given to commands when they pop or execute
pub struct ExecutionContext<'a> {
    pub now: f64,
    pub delta_time: f64,
    pub host: &'a mut dyn VesselHost,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(now: f64, delta_time: f64, host: &'a mut dyn VesselHost) -> Self {
        Self {
            now,
            delta_time,
            host,
        }
    }
}

/// A side effect observed by `RecordingHost`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostEffect {
    ActionGroup(String),
    PartEvent { part: String, event: String },
    Hibernation(bool),
    Target(Option<NodeId>),
    TimeWarpReduced { rate: f64 },
}

/// Host that records every side effect and models time warp as a divide-by-two ladder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingHost {
    pub time_warp_rate: f64,
    pub autopilot: bool,
    pub thrust_acceleration: f64,
    pub hibernating: bool,
    pub target: Option<NodeId>,
    pub effects: Vec<HostEffect>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            time_warp_rate: 1.0,
            autopilot: false,
            thrust_acceleration: 0.0,
            hibernating: false,
            target: None,
            effects: Vec::new(),
        }
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action_groups_fired(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                HostEffect::ActionGroup(g) => Some(g.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl VesselHost for RecordingHost {
    fn time_warp_rate(&self) -> f64 {
        self.time_warp_rate
    }

    fn reduce_time_warp(&mut self) -> bool {
        if self.time_warp_rate <= 1.0 {
            return false;
        }
        self.time_warp_rate = (self.time_warp_rate / 2.0).max(1.0);
        self.effects.push(HostEffect::TimeWarpReduced {
            rate: self.time_warp_rate,
        });
        true
    }

    fn autopilot_engaged(&self) -> bool {
        self.autopilot
    }

    fn thrust_acceleration(&self) -> f64 {
        self.thrust_acceleration
    }

    fn fire_action_group(&mut self, group: &str) {
        self.effects.push(HostEffect::ActionGroup(group.to_string()));
    }

    fn invoke_part_event(&mut self, part: &str, event: &str) {
        self.effects.push(HostEffect::PartEvent {
            part: part.to_string(),
            event: event.to_string(),
        });
    }

    fn set_hibernation(&mut self, enabled: bool) {
        self.hibernating = enabled;
        self.effects.push(HostEffect::Hibernation(enabled));
    }

    fn set_target(&mut self, target: Option<NodeId>) {
        self.target = target;
        self.effects.push(HostEffect::Target(target));
    }
}
