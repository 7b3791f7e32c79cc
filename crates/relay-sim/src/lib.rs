//! Relay Sim - relay network and flight computers on one step clock
//!
//! `Simulation` owns the node registry, the router and one flight computer
//! per craft, and hands each of them explicit references instead of a
//! shared global. A host drives it once per step:
//!
//! 1. `graph_refresh_tick` rebuilds a slice of the link graph
//! 2. `scheduler_tick` advances every craft's command queue
//! 3. `submit_live_input` routes stick input through the delay line
//!
//! The `relay-sim` binary runs a JSON scenario through the same facade
//! and writes a report.

use flight_computer::FlightComputerError;
use relay_network::{NetworkError, NodeId};
use thiserror::Error;

pub mod report;
pub mod runner;
pub mod scenario;
pub mod simulation;

pub use report::{CraftReport, EventCounts, RunReport};
pub use runner::Runner;
pub use scenario::{BuiltScenario, Scenario, ScenarioAction, ScenarioError, TimelineEntry};
pub use simulation::{Simulation, SimulationSettings};

/// Facade errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    FlightComputer(#[from] FlightComputerError),
    #[error("No flight computer for node {0}")]
    NoFlightComputer(NodeId),
}

pub type Result<T> = std::result::Result<T, SimError>;
