//! Simulation facade

use crate::{Result, SimError};
use flight_computer::{
    Command, ControlInput, EnqueueOptions, EnqueueOutcome, FlightComputer,
    FlightComputerSettings, SchedulerDocument, SchedulerEvent, VesselHost,
};
use relay_network::{
    LinkOracle, NetworkEvent, NetworkSettings, NetworkSnapshot, Node, NodeId, NodeKind,
    NodeRegistry, Router, SignalStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub network: NetworkSettings,
    pub flight_computer: FlightComputerSettings,
}

pub struct Simulation<O: LinkOracle> {
    settings: SimulationSettings,
    registry: NodeRegistry,
    router: Router,
    oracle: O,
    computers: HashMap<NodeId, FlightComputer>,
}

impl<O: LinkOracle> Simulation<O> {
    pub fn new(settings: SimulationSettings, oracle: O) -> Self {
        let router = Router::new(settings.network.clone());
        Self {
            settings,
            registry: NodeRegistry::new(),
            router,
            oracle,
            computers: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Direct access for position, power and local-control updates.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn computer(&self, id: NodeId) -> Result<&FlightComputer> {
        self.computers.get(&id).ok_or(SimError::NoFlightComputer(id))
    }

    pub fn computer_mut(&mut self, id: NodeId) -> Result<&mut FlightComputer> {
        self.computers.get_mut(&id).ok_or(SimError::NoFlightComputer(id))
    }

    /// Crafts with a flight computer, in registration order.
    pub fn craft_ids(&self) -> Vec<NodeId> {
        self.registry
            .iter()
            .filter(|n| self.computers.contains_key(&n.id))
            .map(|n| n.id)
            .collect()
    }

    /// Add a node; crafts get a flight computer.
    pub fn register(&mut self, node: Node) -> Result<NodeId> {
        let is_craft = node.kind == NodeKind::Craft;
        self.router.on_register(&node);
        let id = self.registry.register(node)?;
        if is_craft {
            self.computers.insert(
                id,
                FlightComputer::new(id, self.settings.flight_computer.clone()),
            );
        }
        Ok(id)
    }

    /// Remove a node, its router state and its flight computer, then cancel
    /// every command elsewhere that still points at it.
    pub fn unregister<H>(&mut self, id: NodeId, hosts: &mut HashMap<NodeId, H>) -> Result<Node>
    where
        H: VesselHost + Default,
    {
        let node = self.registry.unregister(id)?;
        self.router.on_unregister(id);
        self.computers.remove(&id);
        hosts.remove(&id);
        for (craft, computer) in self.computers.iter_mut() {
            let host = hosts.entry(*craft).or_default();
            computer.cancel_referencing(id, host);
        }
        info!("Unregistered {}", node.name);
        Ok(node)
    }

    /// Rebuild one slice of the link graph.
    pub fn graph_refresh_tick(&mut self) -> usize {
        self.router.refresh_tick(&self.registry, &self.oracle)
    }

    /// Rebuild every node's links and routes at once.
    pub fn refresh_all(&mut self) -> Result<()> {
        self.router.refresh_all(&self.registry, &self.oracle)?;
        Ok(())
    }

    pub fn status(&self, id: NodeId) -> Result<SignalStatus> {
        let node = self.registry.get(id)?;
        Ok(self.router.signal_status(node))
    }

    /// Delay of the node's best route; zero under local control.
    pub fn current_delay(&self, id: NodeId) -> Result<f64> {
        Ok(self.status(id)?.delay)
    }

    /// Advance every craft's command queue.
    pub fn scheduler_tick<H>(&mut self, now: f64, delta_time: f64, hosts: &mut HashMap<NodeId, H>)
    where
        H: VesselHost + Default,
    {
        for node in self.registry.iter() {
            let Some(computer) = self.computers.get_mut(&node.id) else {
                continue;
            };
            let status = self.router.signal_status(node);
            let host = hosts.entry(node.id).or_default();
            computer.tick(now, delta_time, &status, host);
        }
    }

    /// One full step: graph slice, then command queues.
    pub fn step<H>(&mut self, now: f64, delta_time: f64, hosts: &mut HashMap<NodeId, H>)
    where
        H: VesselHost + Default,
    {
        self.graph_refresh_tick();
        self.scheduler_tick(now, delta_time, hosts);
    }

    /// Push raw operator input through the craft's delay line and active commands.
    pub fn submit_live_input(
        &mut self,
        id: NodeId,
        raw: ControlInput,
        now: f64,
        delta_time: f64,
        host: &mut dyn VesselHost,
    ) -> Result<ControlInput> {
        let status = self.status(id)?;
        let computer = self.computer_mut(id)?;
        Ok(computer.control_step(raw, now, delta_time, &status, host))
    }

    pub fn enqueue(
        &mut self,
        id: NodeId,
        command: Command,
        options: EnqueueOptions,
        now: f64,
    ) -> Result<EnqueueOutcome> {
        let status = self.status(id)?;
        let computer = self.computer_mut(id)?;
        let outcome = computer.enqueue(command, options, now, &status);
        debug!("Enqueue on {}: {:?}", id, outcome);
        Ok(outcome)
    }

    pub fn save(&self, id: NodeId) -> Result<SchedulerDocument> {
        Ok(self.computer(id)?.save())
    }

    pub fn load(
        &mut self,
        id: NodeId,
        doc: &SchedulerDocument,
        now: f64,
        host: &mut dyn VesselHost,
    ) -> Result<()> {
        self.computer_mut(id)?.load(doc, now, host)?;
        Ok(())
    }

    pub fn drain_network_events(&mut self) -> Vec<NetworkEvent> {
        self.router.drain_events()
    }

    /// Scheduler events of every craft, tagged with the craft id.
    pub fn drain_scheduler_events(&mut self) -> Vec<(NodeId, SchedulerEvent)> {
        let mut events = Vec::new();
        for id in self.craft_ids() {
            if let Some(computer) = self.computers.get_mut(&id) {
                events.extend(computer.drain_events().into_iter().map(|e| (id, e)));
            }
        }
        events
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        self.router.snapshot(&self.registry)
    }
}
