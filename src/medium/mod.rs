//!
//! The shared wireless medium as seen by the MACs.
//!
//! A [`Medium`] answers topology questions (who hears whom) and keeps
//! track of the signals currently on the air, so that the receiving MAC
//! can ask for the packet error rate of a transfer once it completes.
//!

use crate::{
    mac::{ExchangeId, MacAddress},
    phy::{Preamble, WifiMode},
    time::{Duration, SimTime},
};

mod ranged;
pub use ranged::*;

/// A period of radio energy emitted by one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub source: MacAddress,
    pub start: SimTime,
    pub end: SimTime,
    pub tx_power_dbm: f64,
}

impl Signal {
    #[must_use]
    pub fn new(source: MacAddress, start: SimTime, duration: Duration, tx_power_dbm: f64) -> Self {
        Self {
            source,
            start,
            end: start + duration,
            tx_power_dbm,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start)
    }

    /// Whether both signals share a period of time.
    #[must_use]
    pub fn overlaps(&self, other: &Signal) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// The payload carried by a signal, required to evaluate its reception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub exchange: ExchangeId,
    pub mode: WifiMode,
    pub preamble: Preamble,
    /// The frame size in bytes.
    pub size: u32,
}

/// The topology and interference view of the simulation.
///
/// Neighbor lists must be deterministic, since they define the order in
/// which side effects on other nodes are applied.
pub trait Medium {
    /// The nodes that can decode frames sent by `node`.
    fn neighbors(&self, node: MacAddress) -> Vec<MacAddress>;

    /// The nodes that sense energy sent by `node`. This is a superset
    /// of [`Medium::neighbors`].
    fn carrier_sense_neighbors(&self, node: MacAddress) -> Vec<MacAddress>;

    /// Whether frames from `from` can reach `to`.
    fn has_link(&self, from: MacAddress, to: MacAddress) -> bool;

    /// Registers a data transfer, which is also interference for all
    /// other transfers.
    fn add_transfer(&mut self, signal: Signal, transfer: Transfer);

    /// Registers a signal without payload, e.g. a control frame.
    fn add_interference(&mut self, signal: Signal);

    /// The probability that `receiver` fails to decode the transfer of
    /// `exchange`.
    fn packet_error_rate(&self, exchange: ExchangeId, receiver: MacAddress) -> f64;

    /// The linear signal to noise ratio of a frame sent now from `from`
    /// to `to`.
    fn snr(&self, from: MacAddress, to: MacAddress, mode: WifiMode, tx_power_dbm: f64) -> f64;
}
