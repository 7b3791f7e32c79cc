//! Headless scenario runner
//!
//! Steps a built scenario on a fixed clock. Each step applies the
//! timeline entries that have come due, refreshes one slice of the graph,
//! ticks every scheduler, then feeds each craft's held input through its
//! delay line.

use crate::report::{CraftReport, EventCounts, RunReport};
use crate::scenario::{BuiltScenario, Result, ScenarioAction, TimelineEntry};
use crate::Simulation;
use flight_computer::{Command, ControlInput, EnqueueOptions, RecordingHost, SchedulerEvent};
use nalgebra::Vector3;
use relay_network::{GeometricOracle, NodeId};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct Runner {
    scenario: String,
    simulation: Simulation<GeometricOracle>,
    hosts: HashMap<NodeId, RecordingHost>,
    names: HashMap<String, NodeId>,
    timeline: Vec<TimelineEntry>,
    next_entry: usize,
    inputs: HashMap<NodeId, ControlInput>,
    last_control: HashMap<NodeId, ControlInput>,
    notices: HashMap<NodeId, Vec<String>>,
    counts: EventCounts,
    now: f64,
    steps: usize,
}

impl Runner {
    pub fn new(name: impl Into<String>, built: BuiltScenario) -> Self {
        Self {
            scenario: name.into(),
            simulation: built.simulation,
            hosts: built.hosts,
            names: built.names,
            timeline: built.timeline,
            next_entry: 0,
            inputs: HashMap::new(),
            last_control: HashMap::new(),
            notices: HashMap::new(),
            counts: EventCounts::default(),
            now: 0.0,
            steps: 0,
        }
    }

    pub fn simulation(&self) -> &Simulation<GeometricOracle> {
        &self.simulation
    }

    pub fn host(&self, id: NodeId) -> Option<&RecordingHost> {
        self.hosts.get(&id)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn counts(&self) -> &EventCounts {
        &self.counts
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Run `steps` steps of `dt` seconds and build the report.
    pub fn run(&mut self, steps: usize, dt: f64) -> Result<RunReport> {
        // Start from a fully built graph so the first commands see real delays
        self.simulation.refresh_all()?;
        self.collect_events();
        for _ in 0..steps {
            self.step(dt)?;
        }
        Ok(self.report(dt))
    }

    pub fn step(&mut self, dt: f64) -> Result<()> {
        let now = self.now;
        self.apply_due_entries(now)?;
        self.simulation.step(now, dt, &mut self.hosts);

        for id in self.simulation.craft_ids() {
            let raw = self.inputs.get(&id).copied().unwrap_or_default();
            let host = self.hosts.entry(id).or_default();
            let output = self.simulation.submit_live_input(id, raw, now, dt, host)?;
            self.last_control.insert(id, output);
        }

        self.collect_events();
        self.steps += 1;
        self.now = self.steps as f64 * dt;
        Ok(())
    }

    fn apply_due_entries(&mut self, now: f64) -> Result<()> {
        while let Some(entry) = self.timeline.get(self.next_entry) {
            if entry.at > now {
                break;
            }
            let entry = entry.clone();
            self.next_entry += 1;
            let Some(id) = self.names.get(&entry.node).copied() else {
                continue;
            };
            if !self.simulation.registry().contains(id) {
                warn!("Timeline entry for removed node {} skipped", entry.node);
                continue;
            }
            self.apply(id, &entry, now)?;
        }
        Ok(())
    }

    fn apply(&mut self, id: NodeId, entry: &TimelineEntry, now: f64) -> Result<()> {
        debug!("t={:.2} {}: {:?}", now, entry.node, entry.action);
        match &entry.action {
            ScenarioAction::Enqueue {
                command,
                ignore_extra,
            } => {
                let options = EnqueueOptions {
                    ignore_extra: *ignore_extra,
                    ..Default::default()
                };
                let outcome = self.simulation.enqueue(
                    id,
                    Command::new(command.clone(), now),
                    options,
                    now,
                )?;
                self.counts.record_outcome(&outcome);
                info!("{} <- {}: {:?}", entry.node, command, outcome);
            }
            ScenarioAction::SetPowered { powered } => {
                self.simulation.registry_mut().set_powered(id, *powered).map_err(crate::SimError::from)?;
            }
            ScenarioAction::SetLocalControl { local } => {
                self.simulation.registry_mut().set_local_control(id, *local).map_err(crate::SimError::from)?;
            }
            ScenarioAction::SetTotalDelay { seconds } => {
                self.simulation.computer_mut(id)?.set_total_delay(*seconds);
            }
            ScenarioAction::Move { position } => {
                let position = Vector3::new(position[0], position[1], position[2]);
                self.simulation.registry_mut().set_position(id, position).map_err(crate::SimError::from)?;
            }
            ScenarioAction::Input { input } => {
                self.inputs.insert(id, *input);
            }
            ScenarioAction::Unregister => {
                self.simulation.unregister(id, &mut self.hosts)?;
                self.inputs.remove(&id);
            }
        }
        Ok(())
    }

    fn collect_events(&mut self) {
        for event in self.simulation.drain_network_events() {
            self.counts.record_network(&event);
        }
        for (id, event) in self.simulation.drain_scheduler_events() {
            self.counts.record_scheduler(&event);
            if let SchedulerEvent::Notice { message } = event {
                self.notices.entry(id).or_default().push(message);
            }
        }
    }

    pub fn report(&self, dt: f64) -> RunReport {
        let crafts = self
            .simulation
            .craft_ids()
            .into_iter()
            .filter_map(|id| {
                let node = self.simulation.registry().get(id).ok()?;
                let computer = self.simulation.computer(id).ok()?;
                let status = self.simulation.router().signal_status(node);
                Some(CraftReport {
                    id,
                    name: node.name.clone(),
                    delay_s: status.delay.is_finite().then_some(status.delay),
                    status: computer.status(&status),
                    scheduler: computer.save(),
                    last_control: self.last_control.get(&id).copied().unwrap_or_default(),
                    host_effects: self.hosts.get(&id).map(|h| h.effects.clone()).unwrap_or_default(),
                    notices: self.notices.get(&id).cloned().unwrap_or_default(),
                })
            })
            .collect();

        RunReport {
            scenario: self.scenario.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            steps: self.steps,
            dt,
            final_time: self.now,
            network: self.simulation.snapshot(),
            crafts,
            events: self.counts.clone(),
        }
    }
}
