use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};
use tracing::info;

use super::{schedule_frame, SetOnline, WifiSim};
use crate::{
    mac::{ConfigError, ConfigErrorKind, Destination, MacAddress, MacConfig},
    medium::{Position, RadioParameters, RangedMedium},
    phy::LogDistanceLoss,
    runtime::{Builder, Runtime},
    time::{Duration, SimTime},
};

/// A complete simulation setup, usually read from a YAML file.
///
/// ```yaml
/// seed: 42
/// limit: 10.0
/// mac:
///   standard: g
///   rate_manager: arf
/// nodes:
///   - { address: 1, position: { x: 0.0, y: 0.0 } }
///   - { address: 2, position: { x: 20.0, y: 0.0 } }
/// traffic:
///   - { time: 0.1, source: 1, destination: 2, payload: 1000 }
///   - { time: 0.2, source: 2, payload: 200 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub seed: u64,
    /// The simulation ends at this time, in seconds.
    #[serde(default)]
    pub limit: Option<SimTime>,
    /// The simulation ends after this many events.
    #[serde(default)]
    pub max_events: Option<usize>,
    #[serde(default)]
    pub mac: MacConfig,
    /// The path loss exponent of the medium.
    #[serde(default = "default_exponent")]
    pub path_loss_exponent: f64,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub traffic: Vec<TrafficSpec>,
    /// Online state changes.
    #[serde(default)]
    pub churn: Vec<ChurnSpec>,
}

fn default_exponent() -> f64 {
    LogDistanceLoss::DEFAULT_EXPONENT
}

fn default_true() -> bool {
    true
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub address: MacAddress,
    pub position: Position,
    #[serde(default = "default_true")]
    pub online: bool,
}

/// One or more frames sent by the upper layer of `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrafficSpec {
    pub time: SimTime,
    pub source: MacAddress,
    /// Broadcast if absent.
    #[serde(default)]
    pub destination: Option<MacAddress>,
    /// The upper layer payload in bytes.
    pub payload: u32,
    #[serde(default = "default_count")]
    pub count: u32,
    /// The time between two frames, in seconds.
    #[serde(default)]
    pub interval: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChurnSpec {
    pub time: SimTime,
    pub node: MacAddress,
    pub online: bool,
}

impl Scenario {
    /// Parses and validates a scenario.
    ///
    /// # Errors
    ///
    /// Fails for malformed YAML or invalid content.
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        let scenario: Scenario = serde_yml::from_str(s)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reads a scenario file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Checks the MAC configuration and all node references.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mac.validate()?;

        let mut addresses = HashSet::new();
        for node in &self.nodes {
            if !addresses.insert(node.address) {
                return Err(ConfigError::new(
                    ConfigErrorKind::DuplicateNode,
                    format!("node {} is defined twice", node.address),
                ));
            }
        }

        let unknown = |addr: &MacAddress| {
            ConfigError::new(
                ConfigErrorKind::UnknownNode,
                format!("node {addr} is not defined"),
            )
        };
        for traffic in &self.traffic {
            if !addresses.contains(&traffic.source) {
                return Err(unknown(&traffic.source));
            }
            match traffic.destination {
                Some(to) if !addresses.contains(&to) => return Err(unknown(&to)),
                _ => {}
            }
            if traffic.interval < 0.0 || !traffic.interval.is_finite() {
                return Err(ConfigError::new(
                    ConfigErrorKind::Parse,
                    format!("invalid traffic interval {}", traffic.interval),
                ));
            }
        }
        for churn in &self.churn {
            if !addresses.contains(&churn.node) {
                return Err(unknown(&churn.node));
            }
        }
        Ok(())
    }

    /// Builds the medium and all MACs.
    ///
    /// # Errors
    ///
    /// Fails if the scenario is invalid.
    pub fn build_sim(&self) -> Result<WifiSim, ConfigError> {
        self.validate()?;

        let frequency = self.mac.standard.frequency(self.mac.channel);
        let loss = LogDistanceLoss::for_frequency(frequency).with_exponent(self.path_loss_exponent);
        let radio = RadioParameters {
            tx_power_dbm: self.mac.tx_power_dbm,
            ..RadioParameters::default()
        };

        let mut medium = RangedMedium::new(loss, radio);
        for node in &self.nodes {
            medium.place(node.address, node.position);
        }
        info!(
            "medium on {} MHz with a link range of {:.1} m",
            frequency / 1_000_000,
            medium.link_range()
        );

        let mut sim = WifiSim::new(medium);
        for node in &self.nodes {
            sim.add_node(node.address, &self.mac)?;
        }
        Ok(sim)
    }

    /// Builds a runtime with all traffic and churn scheduled.
    ///
    /// # Errors
    ///
    /// Fails if the scenario is invalid.
    pub fn build(&self) -> Result<Runtime<WifiSim>, ConfigError> {
        let sim = self.build_sim()?;

        let mut builder = Builder::seeded(self.seed).quiet();
        if let Some(limit) = self.limit {
            builder = builder.max_time(limit);
        }
        if let Some(max) = self.max_events {
            builder = builder.max_itr(max);
        }
        let mut rt = builder.build(sim);

        for node in self.nodes.iter().filter(|n| !n.online) {
            rt.add_event(
                SetOnline {
                    node: node.address,
                    online: false,
                },
                SimTime::ZERO,
            );
        }
        for churn in &self.churn {
            rt.add_event(
                SetOnline {
                    node: churn.node,
                    online: churn.online,
                },
                churn.time,
            );
        }

        for traffic in &self.traffic {
            let destination = traffic
                .destination
                .map_or(Destination::Broadcast, Destination::Unicast);
            let interval = Duration::from_secs_f64(traffic.interval);
            let mut time = traffic.time;
            for _ in 0..traffic.count {
                schedule_frame(&mut rt, time, traffic.source, destination, traffic.payload);
                time += interval;
            }
        }

        Ok(rt)
    }
}
