//! The 802.11 ad-hoc MAC: medium access, rate adaptation and the
//! per-node engine state.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod dcf;
pub use dcf::*;

pub mod rate;

mod cache;
pub use cache::*;

mod frame;
pub use frame::*;

mod queue;
pub use queue::*;

mod config;
pub use config::*;

mod engine;
pub use engine::*;

/// The hardware address of a simulated network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(u64);

impl MacAddress {
    /// The largest representable address (48 bit).
    pub const MAX: MacAddress = MacAddress(0xffff_ffff_ffff);

    /// Creates an address from its numeric value.
    ///
    /// # Panics
    ///
    /// Panics if the value does not fit into 48 bits.
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        assert!(addr <= Self::MAX.0, "mac address exceeds 48 bits");
        Self(addr)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for MacAddress {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// The receiver of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A single peer.
    Unicast(MacAddress),
    /// All neighbors of the sender.
    Broadcast,
}

impl Destination {
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::Broadcast)
    }

    /// The peer of a unicast destination.
    #[must_use]
    pub fn unicast(&self) -> Option<MacAddress> {
        match self {
            Self::Unicast(addr) => Some(*addr),
            Self::Broadcast => None,
        }
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unicast(addr) => addr.fmt(f),
            Self::Broadcast => f.write_str("ff:ff:ff:ff:ff:ff"),
        }
    }
}

/// The reason a frame was dropped before it reached its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropReason {
    /// There is no link to the destination.
    NoLink,
    /// The retransmission limit was exceeded.
    LinkDrop,
    /// The outbound queue was full.
    QueueFull,
    /// The frame waited too long in the outbound queue.
    QueueTimeout,
    /// The sending MAC went offline.
    SendingMacOffline,
    /// The receiving MAC was offline.
    ReceivingMacOffline,
}

impl Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoLink => "NO_LINK",
            Self::LinkDrop => "LINK_DROP",
            Self::QueueFull => "QUEUE_FULL",
            Self::QueueTimeout => "QUEUE_TIMEOUT",
            Self::SendingMacOffline => "SENDING_MAC_OFFLINE",
            Self::ReceivingMacOffline => "RECEIVING_MAC_OFFLINE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display() {
        assert_eq!(MacAddress::new(1).to_string(), "00:00:00:00:00:01");
        assert_eq!(
            MacAddress::new(0x0a0b_0c0d_0e0f).to_string(),
            "0a:0b:0c:0d:0e:0f"
        );
        assert_eq!(Destination::Broadcast.to_string(), "ff:ff:ff:ff:ff:ff");
    }

    #[test]
    #[should_panic(expected = "48 bits")]
    fn address_range() {
        let _ = MacAddress::new(1 << 48);
    }

    #[test]
    fn address_from_yaml() {
        let a: MacAddress = serde_yml::from_str("4").unwrap();
        assert_eq!(Destination::Unicast(a).unicast(), Some(MacAddress::new(4)));
        assert_eq!(Destination::Broadcast.unicast(), None);
        assert_eq!(DropReason::LinkDrop.to_string(), "LINK_DROP");
    }
}
