use std::fmt::Display;

use super::{Destination, MacAddress};
use crate::{
    phy::WifiMode,
    time::{Duration, SimTime},
};

/// Frame check sequence.
pub const FCS_SIZE: u32 = 4;
/// RTS: MAC header and FCS.
pub const RTS_SIZE: u32 = 16 + FCS_SIZE;
/// CTS: MAC header and FCS.
pub const CTS_SIZE: u32 = 10 + FCS_SIZE;
/// ACK: MAC header and FCS.
pub const ACK_SIZE: u32 = 10 + FCS_SIZE;
/// The overhead a data frame adds to its payload.
pub const MAC_HEADER_SIZE: u32 = 34;
/// Frames of this size or larger are sent anyway, but indicate a
/// misconfigured fragmentation threshold in the upper layer.
pub const MAX_FRAME_SIZE: u32 = 2304;

/// A frame handed down by the upper layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkFrame {
    /// An identifier chosen by the upper layer.
    pub id: u64,
    pub source: MacAddress,
    pub destination: Destination,
    /// The upper layer payload in bytes.
    pub payload_size: u32,
}

impl LinkFrame {
    /// The size on the air, including the MAC header.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.payload_size + MAC_HEADER_SIZE
    }

    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }
}

impl Display for LinkFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} -> {} ({} B)",
            self.id,
            self.source,
            self.destination,
            self.size()
        )
    }
}

/// The kinds of frames that occupy the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Rts,
    Cts,
    Ack,
    /// A data frame of the given size.
    Data(u32),
}

impl FrameKind {
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            Self::Rts => RTS_SIZE,
            Self::Cts => CTS_SIZE,
            Self::Ack => ACK_SIZE,
            Self::Data(size) => size,
        }
    }
}

/// Identifies a single send attempt. Retries of the same frame get new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// The record of one send attempt, shared by sender and receivers.
#[derive(Debug, Clone)]
pub struct FrameExchange {
    pub id: ExchangeId,
    pub sender: MacAddress,
    pub destination: Destination,
    pub frame: LinkFrame,
    /// The time the frame spent in the outbound queue.
    pub queue_delay: Duration,

    /// The data mode, known once the exchange type was chosen.
    pub data_mode: Option<WifiMode>,
    pub ack_mode: Option<WifiMode>,
    pub data_duration: Duration,
    pub ack_duration: Duration,
}

impl FrameExchange {
    #[must_use]
    pub fn new(id: ExchangeId, frame: LinkFrame, enqueued: SimTime) -> Self {
        Self {
            id,
            sender: frame.source,
            destination: frame.destination,
            queue_delay: SimTime::now().saturating_duration_since(enqueued),
            frame,
            data_mode: None,
            ack_mode: None,
            data_duration: Duration::ZERO,
            ack_duration: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }

    /// The unicast receiver.
    ///
    /// # Panics
    ///
    /// Panics for broadcast exchanges.
    #[must_use]
    pub fn receiver(&self) -> MacAddress {
        match self.destination {
            Destination::Unicast(addr) => addr,
            Destination::Broadcast => panic!("broadcast exchange {} has no single receiver", self.id),
        }
    }

    /// The data mode of an exchange that is on the air.
    ///
    /// # Panics
    ///
    /// Panics if the exchange was never transmitted.
    #[must_use]
    pub fn mode(&self) -> WifiMode {
        self.data_mode
            .unwrap_or_else(|| panic!("exchange {} was never transmitted", self.id))
    }
}

impl PartialEq for FrameExchange {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FrameExchange {}
