#![allow(dead_code)]

use des_wifi::{
    mac::{ExchangeId, MacAddress, MacConfig},
    medium::{Medium, Signal, Transfer},
    phy::WifiMode,
    prelude::*,
};
use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

/// Everything a [`ScriptedMedium`] was asked to put on the air.
#[derive(Debug, Default)]
pub struct AirLog {
    pub transfers: Vec<(Signal, Transfer)>,
    pub interference: Vec<Signal>,
}

/// A medium with a fixed topology and a fixed packet error rate.
#[derive(Debug, Clone)]
pub struct ScriptedMedium {
    nodes: BTreeSet<MacAddress>,
    cut: BTreeSet<(MacAddress, MacAddress)>,
    per: f64,
    snr: f64,
    log: Rc<RefCell<AirLog>>,
}

impl ScriptedMedium {
    /// All listed nodes are neighbors of each other.
    pub fn full_mesh(nodes: &[u64]) -> Self {
        Self {
            nodes: nodes.iter().map(|n| MacAddress::new(*n)).collect(),
            cut: BTreeSet::new(),
            per: 0.0,
            snr: 1000.0,
            log: Rc::default(),
        }
    }

    /// Removes the link between `a` and `b` in both directions.
    pub fn without_link(mut self, a: u64, b: u64) -> Self {
        let (a, b) = (MacAddress::new(a), MacAddress::new(b));
        self.cut.insert((a, b));
        self.cut.insert((b, a));
        self
    }

    pub fn with_per(mut self, per: f64) -> Self {
        self.per = per;
        self
    }

    pub fn log(&self) -> Rc<RefCell<AirLog>> {
        Rc::clone(&self.log)
    }
}

impl Medium for ScriptedMedium {
    fn neighbors(&self, node: MacAddress) -> Vec<MacAddress> {
        self.nodes
            .iter()
            .copied()
            .filter(|other| self.has_link(node, *other))
            .collect()
    }

    fn carrier_sense_neighbors(&self, node: MacAddress) -> Vec<MacAddress> {
        self.neighbors(node)
    }

    fn has_link(&self, from: MacAddress, to: MacAddress) -> bool {
        from != to
            && self.nodes.contains(&from)
            && self.nodes.contains(&to)
            && !self.cut.contains(&(from, to))
    }

    fn add_transfer(&mut self, signal: Signal, transfer: Transfer) {
        self.log.borrow_mut().transfers.push((signal, transfer));
    }

    fn add_interference(&mut self, signal: Signal) {
        self.log.borrow_mut().interference.push(signal);
    }

    fn packet_error_rate(&self, _: ExchangeId, _: MacAddress) -> f64 {
        self.per
    }

    fn snr(&self, _: MacAddress, _: MacAddress, _: WifiMode, _: f64) -> f64 {
        self.snr
    }
}

pub fn addr(n: u64) -> MacAddress {
    MacAddress::new(n)
}

/// A simulation of `nodes` on `medium`, all sharing `config`.
pub fn sim_with(medium: ScriptedMedium, nodes: &[u64], config: &MacConfig) -> WifiSim {
    let mut sim = WifiSim::new(medium);
    for node in nodes {
        sim.add_node(addr(*node), config).unwrap();
    }
    sim
}

pub fn runtime(sim: WifiSim) -> Runtime<WifiSim> {
    Builder::seeded(123).quiet().build(sim)
}

/// Ten milliseconds, long enough for every node to have an idle medium.
pub fn start() -> SimTime {
    SimTime::from_micros(10_000)
}
