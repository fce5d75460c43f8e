//! Per-peer transmission rate selection.
//!
//! A [`RateManager`] owns the rate set of one MAC and a [`RateStrategy`]
//! that keeps one station record per remote peer. Records are created on
//! first contact and live for the whole run.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::MacAddress;
use crate::phy::{ErrorRateModel, Standard, WifiMode};

mod arf;
pub use arf::*;

mod ideal;
pub use ideal::*;

/// The available rate adaptation algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateManagerKind {
    /// Automatic rate fallback.
    #[default]
    Arf,
    /// SNR threshold based selection with perfect channel knowledge.
    Ideal,
}

impl Display for RateManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arf => f.write_str("arf"),
            Self::Ideal => f.write_str("ideal"),
        }
    }
}

/// The modes a MAC may use.
#[derive(Debug, Clone)]
pub struct RateSet {
    modes: Vec<WifiMode>,
    basic: Vec<WifiMode>,
    default_mode: WifiMode,
    broadcast_mode: Option<WifiMode>,
}

impl RateSet {
    /// Creates a rate set from the supported modes. The default mode is
    /// the only initial basic mode.
    ///
    /// # Panics
    ///
    /// Panics if `default_mode` is not a supported mode.
    #[must_use]
    pub fn new(mut modes: Vec<WifiMode>, default_mode: WifiMode) -> Self {
        modes.sort();
        modes.dedup();
        assert!(
            modes.contains(&default_mode),
            "default mode {default_mode} is not part of the supported modes"
        );
        Self {
            modes,
            basic: vec![default_mode],
            default_mode,
            broadcast_mode: None,
        }
    }

    /// The supported modes of a PHY standard.
    #[must_use]
    pub fn for_standard(standard: Standard) -> Self {
        Self::new(standard.modes(), standard.default_mode())
    }

    /// All supported modes in ascending order.
    #[must_use]
    pub fn modes(&self) -> &[WifiMode] {
        &self.modes
    }

    /// The modes usable for RTS frames, in insertion order.
    #[must_use]
    pub fn basic_modes(&self) -> &[WifiMode] {
        &self.basic
    }

    #[must_use]
    pub fn default_mode(&self) -> WifiMode {
        self.default_mode
    }

    /// The mode at `index` within the supported modes.
    #[must_use]
    pub fn mode(&self, index: usize) -> WifiMode {
        self.modes[index]
    }

    /// The BSS basic rate set used for control responses.
    fn bss_basic_rate_set(&self) -> [WifiMode; 1] {
        [self.default_mode]
    }

    /// Picks the mode for a CTS or ACK answering a frame sent in `req`.
    ///
    /// The highest BSS basic rate not faster than `req` within its
    /// modulation class wins. If there is none, the highest mandatory rate
    /// matching the same conditions is used.
    ///
    /// # Panics
    ///
    /// Panics if neither set contains a suitable mode, which means the rate
    /// set does not match the PHY standard.
    #[must_use]
    pub fn control_answer_mode(&self, req: WifiMode) -> WifiMode {
        let fits = |m: &&WifiMode| m.phy_rate() <= req.phy_rate() && m.class() == req.class();

        if let Some(mode) = self
            .bss_basic_rate_set()
            .iter()
            .filter(fits)
            .max_by_key(|m| m.phy_rate())
        {
            return *mode;
        }

        match self
            .modes
            .iter()
            .filter(|m| m.is_mandatory())
            .filter(fits)
            .max_by_key(|m| m.phy_rate())
        {
            Some(mode) => *mode,
            None => panic!(
                "cannot find a response rate for {req}: the selected rates do not match the standard"
            ),
        }
    }
}

/// The closed set of adaptation algorithms.
#[derive(Debug, Clone)]
pub enum RateStrategy {
    Arf(ArfStrategy),
    Ideal(IdealStrategy),
}

/// Rate selection and feedback processing for the peers of one MAC.
#[derive(Debug, Clone)]
pub struct RateManager {
    set: RateSet,
    strategy: RateStrategy,
}

impl RateManager {
    /// Creates a rate manager for the given standard. The error rate model
    /// is only consulted by the ideal strategy.
    #[must_use]
    pub fn new(kind: RateManagerKind, standard: Standard, model: &dyn ErrorRateModel) -> Self {
        Self::with_rate_set(kind, RateSet::for_standard(standard), model)
    }

    /// Creates a rate manager for a custom rate set.
    #[must_use]
    pub fn with_rate_set(kind: RateManagerKind, set: RateSet, model: &dyn ErrorRateModel) -> Self {
        let mut this = Self {
            strategy: match kind {
                RateManagerKind::Arf => RateStrategy::Arf(ArfStrategy::default()),
                RateManagerKind::Ideal => {
                    RateStrategy::Ideal(IdealStrategy::new(set.modes(), model))
                }
            },
            set,
        };

        if kind == RateManagerKind::Ideal {
            for mode in this.set.modes.clone() {
                this.add_basic_mode(mode);
            }
        }
        this
    }

    #[must_use]
    pub fn kind(&self) -> RateManagerKind {
        match self.strategy {
            RateStrategy::Arf(_) => RateManagerKind::Arf,
            RateStrategy::Ideal(_) => RateManagerKind::Ideal,
        }
    }

    #[must_use]
    pub fn rate_set(&self) -> &RateSet {
        &self.set
    }

    #[must_use]
    pub fn strategy(&self) -> &RateStrategy {
        &self.strategy
    }

    /// Adds a mode to the basic modes.
    ///
    /// # Panics
    ///
    /// Panics if the mode is not supported by this manager.
    pub fn add_basic_mode(&mut self, mode: WifiMode) {
        assert!(
            self.set.modes.contains(&mode),
            "cannot add {mode} to the basic modes: not a supported mode"
        );
        if !self.set.basic.contains(&mode) {
            self.set.basic.push(mode);
        }
    }

    /// Overrides the mode used for broadcast data.
    pub fn set_broadcast_data_mode(&mut self, mode: WifiMode) {
        self.set.broadcast_mode = Some(mode);
    }

    #[must_use]
    pub fn broadcast_data_mode(&self) -> WifiMode {
        self.set.broadcast_mode.unwrap_or(self.set.default_mode)
    }

    pub fn unicast_data_mode(&mut self, peer: MacAddress) -> WifiMode {
        match &mut self.strategy {
            RateStrategy::Arf(s) => s.data_mode(&self.set, peer),
            RateStrategy::Ideal(s) => s.data_mode(&self.set, peer),
        }
    }

    pub fn rts_mode(&mut self, peer: MacAddress) -> WifiMode {
        match &mut self.strategy {
            RateStrategy::Arf(s) => s.rts_mode(&self.set, peer),
            RateStrategy::Ideal(s) => s.rts_mode(&self.set, peer),
        }
    }

    #[must_use]
    pub fn cts_mode(&self, rts_mode: WifiMode) -> WifiMode {
        self.set.control_answer_mode(rts_mode)
    }

    #[must_use]
    pub fn ack_mode(&self, data_mode: WifiMode) -> WifiMode {
        self.set.control_answer_mode(data_mode)
    }

    pub fn report_rts_ok(&mut self, peer: MacAddress, cts_snr: f64) {
        if let RateStrategy::Ideal(s) = &mut self.strategy {
            s.observe(peer, cts_snr);
        }
    }

    pub fn report_rts_failed(&mut self, peer: MacAddress) {
        self.touch(peer);
    }

    pub fn report_data_ok(&mut self, peer: MacAddress, ack_snr: f64) {
        match &mut self.strategy {
            RateStrategy::Arf(s) => s.station(peer).on_data_ok(self.set.modes.len()),
            RateStrategy::Ideal(s) => s.observe(peer, ack_snr),
        }
    }

    pub fn report_data_failed(&mut self, peer: MacAddress) {
        match &mut self.strategy {
            RateStrategy::Arf(s) => s.station(peer).on_data_failed(),
            RateStrategy::Ideal(s) => {
                s.station(peer);
            }
        }
    }

    pub fn report_final_rts_failed(&mut self, peer: MacAddress) {
        self.touch(peer);
    }

    pub fn report_final_data_failed(&mut self, peer: MacAddress) {
        self.touch(peer);
    }

    pub fn report_rx_ok(&mut self, peer: MacAddress, _rx_snr: f64) {
        self.touch(peer);
    }

    /// Creates the station record of `peer` if it does not exist yet.
    fn touch(&mut self, peer: MacAddress) {
        match &mut self.strategy {
            RateStrategy::Arf(s) => {
                s.station(peer);
            }
            RateStrategy::Ideal(s) => {
                s.station(peer);
            }
        }
    }

    /// The number of peers with a station record.
    #[must_use]
    pub fn num_stations(&self) -> usize {
        match &self.strategy {
            RateStrategy::Arf(s) => s.stations.len(),
            RateStrategy::Ideal(s) => s.stations.len(),
        }
    }
}

type StationMap<S> = FxHashMap<MacAddress, S>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::*;

    #[test]
    fn basic_set_precedes_mandatory_fallback() {
        let set = RateSet::for_standard(Standard::A);
        assert_eq!(set.basic_modes(), &[OFDM_6MBPS]);
        assert_eq!(set.control_answer_mode(OFDM_24MBPS), OFDM_6MBPS);
        assert_eq!(set.control_answer_mode(OFDM_54MBPS), OFDM_6MBPS);
    }

    #[test]
    fn mandatory_fallback_matches_class() {
        // the DSSS default cannot answer ERP-OFDM frames
        let set = RateSet::for_standard(Standard::G);
        assert_eq!(set.control_answer_mode(ERP_OFDM_54MBPS), ERP_OFDM_24MBPS);
        assert_eq!(set.control_answer_mode(ERP_OFDM_18MBPS), ERP_OFDM_12MBPS);
        assert_eq!(set.control_answer_mode(DSSS_11MBPS), DSSS_1MBPS);
    }

    #[test]
    #[should_panic(expected = "cannot find a response rate")]
    fn foreign_class_is_a_configuration_error() {
        let set = RateSet::for_standard(Standard::B);
        let _ = set.control_answer_mode(OFDM_6MBPS);
    }

    #[test]
    #[should_panic(expected = "not a supported mode")]
    fn basic_mode_must_be_supported() {
        let mut rm = RateManager::new(RateManagerKind::Arf, Standard::B, &NistErrorRateModel);
        rm.add_basic_mode(OFDM_6MBPS);
    }

    #[test]
    fn broadcast_mode_defaults() {
        let mut rm = RateManager::new(RateManagerKind::Arf, Standard::G, &NistErrorRateModel);
        assert_eq!(rm.broadcast_data_mode(), DSSS_1MBPS);
        rm.set_broadcast_data_mode(ERP_OFDM_12MBPS);
        assert_eq!(rm.broadcast_data_mode(), ERP_OFDM_12MBPS);
    }

    #[test]
    fn stations_are_created_lazily() {
        let mut rm = RateManager::new(RateManagerKind::Ideal, Standard::A, &NistErrorRateModel);
        assert_eq!(rm.kind(), RateManagerKind::Ideal);
        assert_eq!(rm.rate_set().basic_modes().len(), 8);
        assert_eq!(rm.num_stations(), 0);

        let peer = MacAddress::new(2);
        rm.report_rx_ok(peer, 1.0);
        rm.report_data_failed(peer);
        let _ = rm.unicast_data_mode(MacAddress::new(3));
        assert_eq!(rm.num_stations(), 2);
    }
}
