//! Link oracle
//!
//! Answers the three geometric questions the graph builder asks: is there a
//! clear line of sight, which link (if any) the antennas support, and how far
//! apart two nodes are. The router depends only on the trait so tests and
//! hosts can swap in their own geometry.

use crate::{Body, Link, LinkClass, NetworkSettings, Node, RangeModel};
use uuid::Uuid;

/// Source of link facts for the graph builder
pub trait LinkOracle: Send + Sync {
    /// No body blocks the straight segment between the two nodes.
    fn has_line_of_sight(&self, a: &Node, b: &Node) -> bool;

    /// Link from `a` to `b`, or None. Line of sight is a precondition.
    fn link(&self, a: &Node, b: &Node) -> Option<Link>;

    /// Straight-line distance in metres.
    fn distance(&self, a: &Node, b: &Node) -> f64 {
        (a.position - b.position).norm()
    }
}

/// Sphere-occlusion line of sight with antenna range models
#[derive(Debug, Clone)]
pub struct GeometricOracle {
    bodies: Vec<Body>,
    range_model: RangeModel,
    omni_multiplier: f64,
    dish_multiplier: f64,
}

impl GeometricOracle {
    pub fn new(settings: &NetworkSettings) -> Self {
        Self {
            bodies: Vec::new(),
            range_model: settings.range_model,
            omni_multiplier: settings.omni_multiplier,
            dish_multiplier: settings.dish_multiplier,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.bodies.push(body);
        self
    }

    pub fn add_body(&mut self, body: Body) -> Uuid {
        let id = body.id;
        self.bodies.push(body);
        id
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: Uuid) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_by_name(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.name == name)
    }

    /// Whether an antenna on `from` points at `to`.
    fn aims_at(&self, antenna_target: Option<Uuid>, cos_angle: f64, from: &Node, to: &Node) -> bool {
        let Some(target) = antenna_target else {
            return false;
        };
        if target == to.id {
            return true;
        }
        let Some(body) = self.body(target) else {
            return false;
        };
        let to_body = body.position - from.position;
        let to_node = to.position - from.position;
        let norms = to_body.norm() * to_node.norm();
        if norms <= 0.0 {
            return false;
        }
        to_body.dot(&to_node) / norms >= cos_angle
    }

    /// Best live omni on a node: (port, scaled range)
    fn best_omni(&self, node: &Node) -> Option<(usize, f64)> {
        node.live_antennas()
            .filter(|(_, a)| a.omni_range_m > 0.0)
            .map(|(port, a)| (port, a.omni_range_m * self.omni_multiplier))
            .max_by(|x, y| x.1.total_cmp(&y.1))
    }

    /// Longest live dish on `from` aimed at `to` (scaled range)
    fn best_dish_towards(&self, from: &Node, to: &Node) -> Option<f64> {
        from.live_antennas()
            .filter(|(_, a)| a.dish_range_m > 0.0 && self.aims_at(a.target, a.cos_angle, from, to))
            .map(|(_, a)| a.dish_range_m * self.dish_multiplier)
            .max_by(|x, y| x.total_cmp(y))
    }
}

impl LinkOracle for GeometricOracle {
    fn has_line_of_sight(&self, a: &Node, b: &Node) -> bool {
        !self
            .bodies
            .iter()
            .any(|body| body.occludes(&a.position, &b.position))
    }

    fn link(&self, a: &Node, b: &Node) -> Option<Link> {
        if !self.has_line_of_sight(a, b) {
            return None;
        }
        let distance = self.distance(a, b);
        let a_omni = self.best_omni(a);
        let b_omni = self.best_omni(b);

        if let (Some((port, ra)), Some((_, rb))) = (a_omni, b_omni) {
            if distance <= self.range_model.combine(ra, rb) {
                return Some(Link::new(a.id, b.id, LinkClass::Omni, port));
            }
        }

        // Dish on our side, anything on theirs
        let b_reach = self
            .best_dish_towards(b, a)
            .into_iter()
            .chain(b_omni.map(|(_, r)| r))
            .fold(0.0_f64, f64::max);
        if b_reach > 0.0 {
            for (port, antenna) in a.live_antennas() {
                if antenna.dish_range_m <= 0.0
                    || !self.aims_at(antenna.target, antenna.cos_angle, a, b)
                {
                    continue;
                }
                let ra = antenna.dish_range_m * self.dish_multiplier;
                if distance <= self.range_model.combine(ra, b_reach) {
                    return Some(Link::new(a.id, b.id, LinkClass::Directional, port));
                }
            }
        }

        // Omni on our side, their dish aimed at us
        if let (Some((port, ra)), Some(rb)) = (a_omni, self.best_dish_towards(b, a)) {
            if distance <= self.range_model.combine(ra, rb) {
                return Some(Link::new(a.id, b.id, LinkClass::Directional, port));
            }
        }

        None
    }
}
