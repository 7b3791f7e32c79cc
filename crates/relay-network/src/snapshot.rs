//! Serializable view of the network for reports

use crate::{Link, NodeId, NodeKind, NodeRegistry, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub position: [f64; 3],
    pub powered: bool,
    pub local_control: bool,
    pub link_count: usize,
    /// Best route delay (s); None when unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_s: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRoute {
    pub start: String,
    pub goal: String,
    /// Node names along the route
    pub hops: Vec<String>,
    pub length_m: f64,
    pub delay_s: f64,
}

/// Nodes, links and best routes at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub links: Vec<Link>,
    pub routes: Vec<SnapshotRoute>,
}

impl NetworkSnapshot {
    pub fn capture(registry: &NodeRegistry, router: &Router) -> Self {
        let name_of = |id: NodeId| {
            registry
                .get(id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|_| id.to_string())
        };

        let nodes = registry
            .iter()
            .map(|n| {
                let delay = router.current_delay(n);
                SnapshotNode {
                    id: n.id,
                    name: n.name.clone(),
                    kind: n.kind,
                    position: [n.position.x, n.position.y, n.position.z],
                    powered: n.is_powered(),
                    local_control: n.local_control,
                    link_count: router.links(n.id).map(|l| l.len()).unwrap_or(0),
                    delay_s: delay.is_finite().then_some(delay),
                }
            })
            .collect();

        let routes = registry
            .iter()
            .filter_map(|n| router.best_route(n.id))
            .map(|r| SnapshotRoute {
                start: name_of(r.start),
                goal: name_of(r.goal),
                hops: r.hops().into_iter().map(name_of).collect(),
                length_m: r.length,
                delay_s: r.delay,
            })
            .collect();

        Self {
            nodes,
            links: router.all_links().cloned().collect(),
            routes,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Antenna, GeometricOracle, NetworkSettings, Node};
    use nalgebra::Vector3;

    #[test]
    fn test_snapshot_names_routes() {
        let settings = NetworkSettings::default();
        let mut registry = NodeRegistry::new();
        let mut router = Router::new(settings.clone());
        let oracle = GeometricOracle::new(&settings);

        let probe = Node::craft("Probe", Vector3::zeros(), "Sun").with_antenna(Antenna::omni("o", 1.0e9));
        let gs = Node::ground_station("KSC", Vector3::new(3.0e8, 0.0, 0.0), "Sun")
            .with_antenna(Antenna::omni("o", 1.0e9));
        for node in [probe, gs] {
            router.on_register(&node);
            registry.register(node).unwrap();
        }
        router.refresh_all(&registry, &oracle).unwrap();

        let snapshot = router.snapshot(&registry);
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.links.len(), 2);
        assert_eq!(snapshot.routes.len(), 1);
        assert_eq!(snapshot.routes[0].hops, vec!["Probe", "KSC"]);
        assert!((snapshot.nodes[0].delay_s.unwrap() - 1.0).abs() < 1e-9);
        assert!(snapshot.nodes[1].delay_s.is_none());

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"KSC\""));
    }
}
