//! Property tests for graph building and route caching

use nalgebra::Vector3;
use proptest::prelude::*;
use relay_network::{
    Antenna, Body, GeometricOracle, LinkOracle, NetworkSettings, Node, NodeRegistry, Router,
};

/// Position within a few light-seconds of the origin
fn position() -> impl Strategy<Value = Vector3<f64>> {
    (-1.0e9..1.0e9f64, -1.0e9..1.0e9f64, -1.0e8..1.0e8f64).prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

/// Craft or ground station with one omni antenna, possibly unpowered
fn node() -> impl Strategy<Value = Node> {
    (position(), 1.0e8..3.0e9f64, any::<bool>(), prop::bool::weighted(0.8)).prop_map(
        |(position, range, station, powered)| {
            let mut node = if station {
                Node::ground_station("gs", position, "Sun")
            } else {
                Node::craft("craft", position, "Sun")
            };
            node.powered = powered;
            node.with_antenna(Antenna::omni("omni", range))
        },
    )
}

fn body() -> impl Strategy<Value = Body> {
    (position(), 1.0e7..2.0e8f64).prop_map(|(position, radius)| Body::new("rock", position, radius))
}

fn network(nodes: Vec<Node>, bodies: Vec<Body>) -> (NodeRegistry, Router, GeometricOracle) {
    let settings = NetworkSettings::default();
    let mut oracle = GeometricOracle::new(&settings);
    for body in bodies {
        oracle.add_body(body);
    }
    let mut registry = NodeRegistry::new();
    let mut router = Router::new(settings);
    for node in nodes {
        router.on_register(&node);
        registry.register(node).unwrap();
    }
    router.refresh_all(&registry, &oracle).unwrap();
    (registry, router, oracle)
}

proptest! {
    #[test]
    fn every_link_has_line_of_sight(
        nodes in prop::collection::vec(node(), 2..10),
        bodies in prop::collection::vec(body(), 0..4),
    ) {
        let (registry, router, oracle) = network(nodes, bodies);
        for link in router.all_links() {
            let a = registry.get(link.source).unwrap();
            let b = registry.get(link.target).unwrap();
            prop_assert!(oracle.has_line_of_sight(a, b));
            prop_assert!(oracle.link(a, b).is_some());
        }
    }

    #[test]
    fn routes_are_sorted_chained_and_stable(
        nodes in prop::collection::vec(node(), 2..10),
        bodies in prop::collection::vec(body(), 0..3),
    ) {
        let (registry, mut router, oracle) = network(nodes, bodies);
        let ids: Vec<_> = registry.ids().collect();
        for id in ids {
            let first: Vec<_> = router.routes(id).to_vec();

            for pair in first.windows(2) {
                prop_assert!(pair[0].length <= pair[1].length);
            }
            for route in &first {
                prop_assert!(route.exists);
                prop_assert_ne!(route.goal, id);
                let hops = route.hops();
                prop_assert_eq!(hops.first().copied(), Some(id));
                prop_assert_eq!(hops.last().copied(), Some(route.goal));
                // Intermediate hops are powered
                for hop in &hops[1..hops.len() - 1] {
                    prop_assert!(registry.get(*hop).unwrap().is_powered());
                }
            }

            // Nothing changed, so a second search yields the same cache
            let second = router.find_routes(id, &registry, &oracle).unwrap().to_vec();
            prop_assert_eq!(&first, &second);

            let node = registry.get(id).unwrap();
            let delay = router.current_delay(node);
            match first.first() {
                Some(best) => prop_assert_eq!(delay, best.delay),
                None => prop_assert!(delay.is_infinite()),
            }
        }
    }
}
