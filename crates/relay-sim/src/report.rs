//! Run report written by the headless runner

use flight_computer::{
    ControlInput, EnqueueOutcome, FlightStatus, HostEffect, SchedulerDocument, SchedulerEvent,
};
use relay_network::{NetworkEvent, NetworkSnapshot, NodeId};
use serde::{Deserialize, Serialize};

/// Number of events of each kind seen during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub nodes_registered: u64,
    pub nodes_unregistered: u64,
    pub links_added: u64,
    pub links_removed: u64,
    pub routes_refreshed: u64,
    pub commands_queued: u64,
    pub commands_denied: u64,
    pub commands_too_late: u64,
    pub commands_activated: u64,
    pub commands_retired: u64,
    pub commands_dropped: u64,
    pub notices: u64,
}

impl EventCounts {
    pub fn record_network(&mut self, event: &NetworkEvent) {
        match event {
            NetworkEvent::NodeRegistered { .. } => self.nodes_registered += 1,
            NetworkEvent::NodeUnregistered { .. } => self.nodes_unregistered += 1,
            NetworkEvent::LinkAdded { .. } => self.links_added += 1,
            NetworkEvent::LinkRemoved { .. } => self.links_removed += 1,
            NetworkEvent::RoutesRefreshed { .. } => self.routes_refreshed += 1,
        }
    }

    pub fn record_scheduler(&mut self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::Queued { .. } => self.commands_queued += 1,
            SchedulerEvent::Activated { .. } => self.commands_activated += 1,
            SchedulerEvent::Retired { .. } => self.commands_retired += 1,
            SchedulerEvent::Dropped { .. } => self.commands_dropped += 1,
            SchedulerEvent::Notice { .. } => self.notices += 1,
        }
    }

    /// Rejections never reach the event ring, so they are counted here.
    pub fn record_outcome(&mut self, outcome: &EnqueueOutcome) {
        match outcome {
            EnqueueOutcome::Denied => self.commands_denied += 1,
            EnqueueOutcome::TooLate { .. } => self.commands_too_late += 1,
            EnqueueOutcome::Queued { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftReport {
    pub id: NodeId,
    pub name: String,
    /// Best route delay (s); None when unreachable
    pub delay_s: Option<f64>,
    pub status: FlightStatus,
    pub scheduler: SchedulerDocument,
    pub last_control: ControlInput,
    pub host_effects: Vec<HostEffect>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    /// RFC 3339 generation time
    pub generated_at: String,
    pub steps: usize,
    pub dt: f64,
    pub final_time: f64,
    pub network: NetworkSnapshot,
    pub crafts: Vec<CraftReport>,
    pub events: EventCounts,
}
