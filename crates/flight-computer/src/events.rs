//! Scheduler lifecycle events

use crate::{CommandCategory, CommandId};
use serde::{Deserialize, Serialize};

/// Why an active command left the active map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetireReason {
    /// A newer command took its category slot
    Replaced,
    Completed,
    Cancelled,
}

/// Why a pending command was thrown away without running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    NoPower,
    /// Time-critical command whose moment passed
    Missed,
    /// Target node no longer exists
    StaleReference,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    Queued { id: CommandId, due: f64 },
    Activated { id: CommandId, category: CommandCategory },
    Retired { id: CommandId, reason: RetireReason },
    Dropped { id: CommandId, reason: DropReason },
    /// Operator-facing message
    Notice { message: String },
}
