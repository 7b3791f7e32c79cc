//! Network participants and celestial bodies

use crate::NodeId;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node types in the relay graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Craft,
    /// Always powered and command-capable
    GroundStation,
}

/// A radio on a node.
///
/// An antenna contributes an omni range, a dish range, or both. A dish only
/// counts towards a link when it is aimed at the other end, either directly
/// by node id or at a body whose direction lies inside the cone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Antenna {
    pub name: String,
    #[serde(default)]
    pub omni_range_m: f64,
    #[serde(default)]
    pub dish_range_m: f64,
    /// Cosine of the dish cone half-angle
    #[serde(default = "default_cos_angle")]
    pub cos_angle: f64,
    /// Node id or body id the dish points at
    #[serde(default)]
    pub target: Option<Uuid>,
    #[serde(default = "default_true")]
    pub activated: bool,
    #[serde(default = "default_true")]
    pub powered: bool,
}

fn default_cos_angle() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Antenna {
    pub fn omni(name: impl Into<String>, range_m: f64) -> Self {
        Self {
            name: name.into(),
            omni_range_m: range_m,
            dish_range_m: 0.0,
            cos_angle: 1.0,
            target: None,
            activated: true,
            powered: true,
        }
    }

    pub fn dish(name: impl Into<String>, range_m: f64, cos_angle: f64, target: Option<Uuid>) -> Self {
        Self {
            name: name.into(),
            omni_range_m: 0.0,
            dish_range_m: range_m,
            cos_angle,
            target,
            activated: true,
            powered: true,
        }
    }

    /// Activated and powered
    pub fn is_live(&self) -> bool {
        self.activated && self.powered
    }
}

/// A participant in the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Absolute position (m)
    pub position: Vector3<f64>,
    /// Name of the body the node is closest to
    pub body: String,
    pub powered: bool,
    pub command_capable: bool,
    /// Under direct local control; bypasses all delay
    pub local_control: bool,
    pub antennas: Vec<Antenna>,
}

impl Node {
    pub fn craft(name: impl Into<String>, position: Vector3<f64>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: NodeKind::Craft,
            position,
            body: body.into(),
            powered: true,
            command_capable: false,
            local_control: false,
            antennas: Vec::new(),
        }
    }

    pub fn ground_station(
        name: impl Into<String>,
        position: Vector3<f64>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: NodeKind::GroundStation,
            position,
            body: body.into(),
            powered: true,
            command_capable: true,
            local_control: false,
            antennas: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_antenna(mut self, antenna: Antenna) -> Self {
        self.antennas.push(antenna);
        self
    }

    pub fn command_capable(mut self, capable: bool) -> Self {
        self.command_capable = capable;
        self
    }

    pub fn is_ground_station(&self) -> bool {
        self.kind == NodeKind::GroundStation
    }

    /// Valid route destination: a command station or any ground station
    pub fn is_command_station(&self) -> bool {
        self.command_capable || self.is_ground_station()
    }

    /// Ground stations never lose power.
    pub fn is_powered(&self) -> bool {
        self.powered || self.is_ground_station()
    }

    /// Live antennas with their port index.
    pub fn live_antennas(&self) -> impl Iterator<Item = (usize, &Antenna)> {
        self.antennas.iter().enumerate().filter(|(_, a)| a.is_live())
    }
}

/// A spherical occluder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: Uuid,
    pub name: String,
    pub position: Vector3<f64>,
    pub radius_m: f64,
}

impl Body {
    pub fn new(name: impl Into<String>, position: Vector3<f64>, radius_m: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            position,
            radius_m,
        }
    }

    /// True when the segment `a`-`b` passes strictly inside the sphere.
    pub fn occludes(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        let ab = b - a;
        let len_sq = ab.norm_squared();
        let t = if len_sq > 0.0 {
            ((self.position - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = a + ab * t;
        (closest - self.position).norm() < self.radius_m
    }
}
