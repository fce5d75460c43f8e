use des_wifi::{
    mac::{Destination, DropReason},
    prelude::*,
};
use serial_test::serial;
use std::collections::HashMap;

const SPREAD: &str = "
seed: 3
mac:
  standard: g
  channel: 11
nodes:
  - { address: 1, position: { x: 0, y: 0 } }
  - { address: 2, position: { x: 15, y: 0 } }
  - { address: 3, position: { x: 5000, y: 0 } }
traffic:
  - { time: 0.01, source: 1, destination: 2, payload: 1200, count: 10, interval: 0.01 }
  - { time: 0.05, source: 1, destination: 3, payload: 100 }
  - { time: 0.2, source: 2, payload: 64 }
";

#[test]
#[serial]
fn ranged_scenario_runs_to_completion() {
    let scenario = Scenario::from_yaml(SPREAD).unwrap();
    let (sim, _, _) = scenario.build().unwrap().run().unwrap();

    assert_eq!(sim.metrics.unicast_received, 10);
    assert_eq!(sim.metrics.unicast_bytes_received, 12_000);
    assert_eq!(sim.metrics.dropped(DropReason::NoLink), 1);
    assert_eq!(sim.inbox.drops_at(MacAddress::new(1)).count(), 1);

    // node 3 is out of range of the broadcast
    assert_eq!(sim.metrics.broadcast_sent, 1);
    assert_eq!(sim.metrics.broadcast_received, 1);
    assert_eq!(sim.inbox.delivered_to(MacAddress::new(3)).count(), 0);
    assert_eq!(sim.inbox.delivered_to(MacAddress::new(1)).count(), 1);
}

#[test]
#[serial]
fn equal_seeds_reproduce_runs() {
    let yaml = "
seed: 11
mac:
  rate_manager: ideal
nodes:
  - { address: 1, position: { x: 0, y: 0 } }
  - { address: 2, position: { x: 40, y: 0 } }
  - { address: 3, position: { x: 40, y: 40 } }
traffic:
  - { time: 0.01, source: 1, destination: 2, payload: 800, count: 20, interval: 0.002 }
  - { time: 0.01, source: 3, destination: 2, payload: 800, count: 20, interval: 0.002 }
  - { time: 0.02, source: 2, payload: 200, count: 5, interval: 0.003 }
";
    let scenario = Scenario::from_yaml(yaml).unwrap();

    let (a, _, _) = scenario.build().unwrap().run().unwrap();
    let (b, _, _) = scenario.build().unwrap().run().unwrap();

    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.inbox.deliveries(), b.inbox.deliveries());
}

#[test]
#[serial]
fn contending_stations_account_every_frame() {
    let yaml = "
seed: 5
mac:
  rts_cts_threshold: 600
nodes:
  - { address: 1, position: { x: 0, y: 0 } }
  - { address: 2, position: { x: 20, y: 0 } }
  - { address: 3, position: { x: 10, y: 15 } }
traffic:
  - { time: 0.01, source: 1, destination: 2, payload: 1000, count: 15, interval: 0.001 }
  - { time: 0.01, source: 2, destination: 3, payload: 300, count: 15, interval: 0.001 }
  - { time: 0.01, source: 3, destination: 1, payload: 700, count: 15, interval: 0.001 }
";
    let (sim, _, _) = Scenario::from_yaml(yaml)
        .unwrap()
        .build()
        .unwrap()
        .run()
        .unwrap();

    let mut outcomes: HashMap<u64, usize> = HashMap::new();
    for delivery in sim.inbox.deliveries() {
        assert_eq!(
            delivery.frame.destination,
            Destination::Unicast(delivery.node)
        );
        *outcomes.entry(delivery.frame.id).or_default() += 1;
    }
    for drop in sim.inbox.drops() {
        *outcomes.entry(drop.frame.id).or_default() += 1;
    }

    assert_eq!(outcomes.len(), 45);
    assert!(outcomes.values().all(|n| *n == 1));
    assert_eq!(
        sim.metrics.unicast_received,
        sim.inbox.deliveries().len() as u64
    );

    for node in sim.nodes() {
        assert!(node.current().is_none());
        assert_eq!(node.queue_len(), 0);
    }
}

#[test]
fn scenario_files_parse() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/line.yml");
    let scenario = Scenario::load(path).unwrap();
    assert_eq!(scenario.nodes.len(), 4);
    assert_eq!(scenario.churn.len(), 2);
    assert_eq!(scenario.mac.rts_cts_threshold, 1000);
}

#[test]
#[serial]
fn event_limit_ends_the_run_early() {
    let yaml = "
max_events: 5
nodes:
  - { address: 1, position: { x: 0, y: 0 } }
  - { address: 2, position: { x: 10, y: 0 } }
traffic:
  - { time: 0.01, source: 1, destination: 2, payload: 100, count: 10, interval: 0.01 }
";
    let (sim, time, profiler) = Scenario::from_yaml(yaml)
        .unwrap()
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(profiler.event_count, 5);
    assert!(time < SimTime::from_micros(100_000));
    assert!(sim.metrics.unicast_received < 10);
}
