//! Scenario files
//!
//! A scenario is a JSON document with settings, bodies, nodes and a
//! timeline of operator actions. Antenna targets and timeline entries
//! refer to nodes and bodies by name; names are resolved to ids when the
//! scenario is built.

use crate::{SimError, Simulation, SimulationSettings};
use flight_computer::{CommandKind, ControlInput, RecordingHost};
use nalgebra::Vector3;
use relay_network::{Antenna, Body, GeometricOracle, Node, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    #[error("Unknown antenna target {target} on {node}")]
    UnknownTarget { node: String, target: String },
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    #[error(transparent)]
    Simulation(#[from] SimError),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

fn default_true() -> bool {
    true
}

fn default_cos_angle() -> f64 {
    1.0
}

fn default_warp() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    pub position: [f64; 3],
    pub radius_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntennaSpec {
    pub name: String,
    #[serde(default)]
    pub omni_range_m: f64,
    #[serde(default)]
    pub dish_range_m: f64,
    #[serde(default = "default_cos_angle")]
    pub cos_angle: f64,
    /// Node or body name
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default = "default_true")]
    pub activated: bool,
}

/// Initial host state for a craft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    #[serde(default = "default_warp")]
    pub time_warp_rate: f64,
    #[serde(default)]
    pub autopilot: bool,
    #[serde(default)]
    pub thrust_acceleration: f64,
}

impl Default for HostSpec {
    fn default() -> Self {
        Self {
            time_warp_rate: 1.0,
            autopilot: false,
            thrust_acceleration: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    /// Fixed id, so commands in the timeline can reference the node
    #[serde(default)]
    pub id: Option<Uuid>,
    pub kind: NodeKind,
    pub position: [f64; 3],
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_true")]
    pub powered: bool,
    #[serde(default)]
    pub command_capable: bool,
    #[serde(default)]
    pub local_control: bool,
    #[serde(default)]
    pub antennas: Vec<AntennaSpec>,
    #[serde(default)]
    pub host: HostSpec,
}

/// Operator action applied at a point on the timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioAction {
    Enqueue {
        command: CommandKind,
        #[serde(default)]
        ignore_extra: bool,
    },
    SetPowered { powered: bool },
    SetLocalControl { local: bool },
    SetTotalDelay { seconds: f64 },
    Move { position: [f64; 3] },
    /// Raw input held from now on
    Input { input: ControlInput },
    Unregister,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: f64,
    pub node: String,
    pub action: ScenarioAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: SimulationSettings,
    #[serde(default)]
    pub bodies: Vec<BodySpec>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

/// A scenario turned into live objects
pub struct BuiltScenario {
    pub simulation: Simulation<GeometricOracle>,
    pub hosts: HashMap<NodeId, RecordingHost>,
    pub names: HashMap<String, NodeId>,
    /// Sorted by time; equal times keep file order
    pub timeline: Vec<TimelineEntry>,
}

fn vector(v: [f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading scenario from {:?}", path);
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn build(&self) -> Result<BuiltScenario> {
        let mut oracle = GeometricOracle::new(&self.settings.network);
        let mut targets: HashMap<String, Uuid> = HashMap::new();
        for def in &self.bodies {
            let id = oracle.add_body(Body::new(&def.name, vector(def.position), def.radius_m));
            if targets.insert(def.name.clone(), id).is_some() {
                return Err(ScenarioError::DuplicateName(def.name.clone()));
            }
        }

        let mut names = HashMap::new();
        for def in &self.nodes {
            let id = def.id.unwrap_or_else(Uuid::new_v4);
            if targets.insert(def.name.clone(), id).is_some() {
                return Err(ScenarioError::DuplicateName(def.name.clone()));
            }
            names.insert(def.name.clone(), id);
        }

        let mut simulation = Simulation::new(self.settings.clone(), oracle);
        let mut hosts = HashMap::new();
        for def in &self.nodes {
            let node = self.build_node(def, &names, &targets)?;
            let id = simulation.register(node)?;
            if def.kind == NodeKind::Craft {
                hosts.insert(
                    id,
                    RecordingHost {
                        time_warp_rate: def.host.time_warp_rate,
                        autopilot: def.host.autopilot,
                        thrust_acceleration: def.host.thrust_acceleration,
                        ..Default::default()
                    },
                );
            }
        }

        for entry in &self.timeline {
            if !names.contains_key(&entry.node) {
                return Err(ScenarioError::UnknownNode(entry.node.clone()));
            }
        }
        let mut timeline = self.timeline.clone();
        timeline.sort_by(|a, b| a.at.total_cmp(&b.at));

        info!(
            "Scenario '{}': {} bodies, {} nodes, {} timeline entries",
            self.name,
            self.bodies.len(),
            self.nodes.len(),
            timeline.len()
        );
        Ok(BuiltScenario {
            simulation,
            hosts,
            names,
            timeline,
        })
    }

    fn build_node(
        &self,
        def: &NodeSpec,
        names: &HashMap<String, NodeId>,
        targets: &HashMap<String, Uuid>,
    ) -> Result<Node> {
        let position = vector(def.position);
        let mut node = match def.kind {
            NodeKind::Craft => Node::craft(&def.name, position, &def.body),
            NodeKind::GroundStation => Node::ground_station(&def.name, position, &def.body),
        };
        let id = names
            .get(&def.name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownNode(def.name.clone()))?;
        node = node.with_id(id);
        node.powered = def.powered;
        node.command_capable |= def.command_capable;
        node.local_control = def.local_control;

        for antenna in &def.antennas {
            let target = match &antenna.target {
                Some(name) => Some(targets.get(name).copied().ok_or_else(|| {
                    ScenarioError::UnknownTarget {
                        node: def.name.clone(),
                        target: name.clone(),
                    }
                })?),
                None => None,
            };
            node.antennas.push(Antenna {
                name: antenna.name.clone(),
                omni_range_m: antenna.omni_range_m,
                dish_range_m: antenna.dish_range_m,
                cos_angle: antenna.cos_angle,
                target,
                activated: antenna.activated,
                powered: true,
            });
        }
        Ok(node)
    }
}
