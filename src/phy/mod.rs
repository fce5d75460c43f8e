//! The physical layer as seen by the MAC: transmission modes, PLCP
//! timing, error rates and signal propagation.

mod mode;
pub use mode::*;

mod standard;
pub use standard::*;

mod error_model;
pub use error_model::*;

mod loss;
pub use loss::*;

use crate::time::{micros, Duration};

/// The PLCP preamble type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preamble {
    /// The long preamble, mandatory for all DSSS stations.
    #[default]
    Long,
    /// The short DSSS preamble.
    Short,
}

/// The mode in which the PLCP header of a `payload` transmission is sent.
#[must_use]
pub fn plcp_header_mode(payload: WifiMode, preamble: Preamble) -> WifiMode {
    match payload.class() {
        ModulationClass::Ofdm => OFDM_6MBPS,
        ModulationClass::ErpOfdm => ERP_OFDM_6MBPS,
        ModulationClass::Dsss => match preamble {
            Preamble::Long => DSSS_1MBPS,
            Preamble::Short => DSSS_2MBPS,
        },
    }
}

/// The duration of the PLCP preamble.
#[must_use]
pub fn plcp_preamble_duration(payload: WifiMode, preamble: Preamble) -> Duration {
    match payload.class() {
        ModulationClass::Ofdm | ModulationClass::ErpOfdm => micros(16),
        ModulationClass::Dsss => match preamble {
            Preamble::Long => micros(144),
            Preamble::Short => micros(72),
        },
    }
}

/// The duration of the PLCP header.
#[must_use]
pub fn plcp_header_duration(payload: WifiMode, preamble: Preamble) -> Duration {
    match payload.class() {
        // only the SIGNAL field, the SERVICE bits count towards the payload
        ModulationClass::Ofdm | ModulationClass::ErpOfdm => micros(4),
        ModulationClass::Dsss => match preamble {
            Preamble::Long => micros(48),
            Preamble::Short => micros(24),
        },
    }
}

const OFDM_SYMBOL_US: u64 = 4;

/// The duration of `size` bytes of payload in the given mode.
#[must_use]
pub fn payload_duration(size: u32, payload: WifiMode) -> Duration {
    let bits = u64::from(size) * 8;
    match payload.class() {
        ModulationClass::Ofdm | ModulationClass::ErpOfdm => {
            let bits_per_symbol = payload.data_rate() * OFDM_SYMBOL_US / 1_000_000;
            // SERVICE field (16) and tail bits (6)
            let symbols = (16 + bits + 6).div_ceil(bits_per_symbol);
            let extension = if payload.class() == ModulationClass::ErpOfdm {
                6
            } else {
                0
            };
            micros(symbols * OFDM_SYMBOL_US + extension)
        }
        ModulationClass::Dsss => micros((bits * 1_000_000).div_ceil(payload.data_rate())),
    }
}

/// The total airtime of a frame with `size` bytes: preamble, header and payload.
#[must_use]
pub fn tx_duration(size: u32, payload: WifiMode, preamble: Preamble) -> Duration {
    plcp_preamble_duration(payload, preamble)
        + plcp_header_duration(payload, preamble)
        + payload_duration(size, payload)
}
