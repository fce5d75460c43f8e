use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::mode::*;
use crate::time::{micros, Duration};

/// The timing parameters of the distributed coordination function,
/// as defined by a PHY standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcfParameters {
    pub slot: Duration,
    pub sifs: Duration,
    pub difs: Duration,
    pub eifs: Duration,
    pub cts_timeout: Duration,
    pub cw_min: u32,
    pub cw_max: u32,
}

/// The supported IEEE 802.11 PHY standards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standard {
    /// 802.11a, OFDM in the 5 GHz band.
    A,
    /// 802.11b, DSSS in the 2.4 GHz band.
    B,
    /// 802.11g, DSSS and ERP-OFDM in the 2.4 GHz band.
    #[default]
    G,
}

impl Standard {
    /// The DCF timing parameters (all in µs).
    #[must_use]
    pub fn dcf_parameters(self) -> DcfParameters {
        match self {
            Self::A => DcfParameters {
                slot: micros(9),
                sifs: micros(16),
                difs: micros(34),
                eifs: micros(94),
                cts_timeout: micros(69),
                cw_min: 15,
                cw_max: 1023,
            },
            Self::B | Self::G => DcfParameters {
                slot: micros(20),
                sifs: micros(10),
                difs: micros(50),
                eifs: micros(364),
                cts_timeout: micros(334),
                cw_min: if self == Self::B { 31 } else { 15 },
                cw_max: 1023,
            },
        }
    }

    /// All modes supported by the standard, in ascending order of data rate.
    #[must_use]
    pub fn modes(self) -> Vec<WifiMode> {
        let mut modes = match self {
            Self::A => OFDM_MODES.to_vec(),
            Self::B => DSSS_MODES.to_vec(),
            Self::G => DSSS_MODES.iter().chain(ERP_OFDM_MODES.iter()).copied().collect(),
        };
        modes.sort();
        modes
    }

    /// The lowest mandatory mode, used as default data and control mode.
    #[must_use]
    pub fn default_mode(self) -> WifiMode {
        match self {
            Self::A => OFDM_6MBPS,
            Self::B | Self::G => DSSS_1MBPS,
        }
    }

    /// The frequency of channel 0 in Hz.
    #[must_use]
    pub fn base_frequency(self) -> u64 {
        match self {
            Self::A => 5_000_000_000,
            Self::B | Self::G => 2_407_000_000,
        }
    }

    /// Whether the channel number is allowed for the standard.
    #[must_use]
    pub fn is_valid_channel(self, channel: u32) -> bool {
        match self {
            Self::A => {
                channel % 4 == 0
                    && ((36..=64).contains(&channel) || (100..=140).contains(&channel))
            }
            Self::B | Self::G => (1..=13).contains(&channel),
        }
    }

    /// The center frequency of the channel in Hz.
    #[must_use]
    pub fn frequency(self, channel: u32) -> u64 {
        self.base_frequency() + u64::from(channel) * 5_000_000
    }
}

impl Display for Standard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "802.11a"),
            Self::B => write!(f, "802.11b"),
            Self::G => write!(f, "802.11g"),
        }
    }
}
