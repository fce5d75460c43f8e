#![allow(clippy::module_name_repetitions)]
//!
//! A discrete event simulation of the IEEE 802.11 ad-hoc MAC layer.
//!
//! The crate simulates a set of stations sharing one wireless medium.
//! Each station runs a [`MacEngine`](crate::mac::MacEngine), composed of a
//! [`DcfManager`](crate::mac::DcfManager) for carrier sense and backoff,
//! a [`RateManager`](crate::mac::rate::RateManager) for link rate
//! adaptation and an outbound queue. The stations exchange frames using
//! RTS/CTS, plain DATA/ACK or broadcasts, driven by the discrete event
//! [`runtime`](crate::runtime).
//!
//! # Running a scenario
//!
//! Simulations are usually described in YAML and loaded as a
//! [`Scenario`](crate::sim::Scenario).
//!
//! ```
//! use des_wifi::prelude::*;
//!
//! let scenario = Scenario::from_yaml("
//! seed: 1
//! nodes:
//!   - { address: 1, position: { x: 0, y: 0 } }
//!   - { address: 2, position: { x: 15, y: 0 } }
//! traffic:
//!   - { time: 0.01, source: 1, destination: 2, payload: 500 }
//! ").unwrap();
//!
//! let (sim, _, _) = scenario.build().unwrap().run().unwrap();
//! assert_eq!(sim.metrics.unicast_received, 1);
//! ```
//!
//! # Building a simulation by hand
//!
//! A [`WifiSim`](crate::sim::WifiSim) accepts any [`Medium`](crate::medium::Medium)
//! implementation, so topologies and error rates can be scripted for tests.
//! Frames are injected with [`schedule_frame`](crate::sim::schedule_frame).
//!

pub mod prelude;

pub mod logger;
pub mod mac;
pub mod medium;
pub mod phy;
pub mod runtime;
pub mod sim;
pub mod time;
