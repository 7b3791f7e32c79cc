//! Flight Computer - delayed command execution for remote craft
//!
//! One flight computer runs per controlled node:
//!
//! - Delayed-action queue: commands wait out the signal delay plus an
//!   operator extra delay, then install into one slot per category
//! - Active commands shape the control signal every control step
//! - Live-input delay line: raw stick/throttle input travels with the
//!   same delay, with autopilot axes applied locally
//! - Versioned JSON persistence that resumes waits across a reload
//!
//! Signal delay and connectivity come in as a `SignalStatus` from the
//! relay network; side effects go out through the `VesselHost` trait.

use thiserror::Error;

pub mod command;
pub mod computer;
pub mod delay_line;
pub mod events;
pub mod host;
pub mod input;
pub mod pending;
pub mod persistence;
pub mod settings;

pub use command::{
    ActionGroupCommand, AttitudeCommand, AttitudeMode, BurnCommand, CancelCommand, Command,
    CommandCategory, CommandId, CommandKind, DriveCommand, HibernationCommand, ManeuverCommand,
    PartEventCommand, PopOutcome, TargetCommand,
};
pub use computer::{EnqueueOptions, EnqueueOutcome, FlightComputer, FlightStatus};
pub use delay_line::DelayLine;
pub use events::{DropReason, RetireReason, SchedulerEvent};
pub use host::{ExecutionContext, HostEffect, RecordingHost, VesselHost};
pub use input::{AttitudeRequest, ControlInput};
pub use pending::PendingQueue;
pub use persistence::{CommandRecord, SchedulerDocument, DOCUMENT_VERSION};
pub use settings::{ConnectionLossThrottle, FlightComputerSettings};

/// Flight computer errors
#[derive(Error, Debug)]
pub enum FlightComputerError {
    #[error("Unsupported scheduler document version: {0}")]
    UnsupportedVersion(u32),
    #[error("Missing section: {0}")]
    MissingSection(&'static str),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlightComputerError>;
