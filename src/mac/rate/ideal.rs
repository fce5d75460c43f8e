use fxhash::FxHashMap;

use super::{RateSet, StationMap};
use crate::{
    mac::MacAddress,
    phy::{ErrorRateModel, WifiMode},
};

/// The bit error rate a selected mode must achieve.
pub const TARGET_BER: f64 = 1e-5;

/// Picks the fastest mode whose SNR threshold lies below the last SNR
/// observed on a control answer from the peer.
#[derive(Debug, Clone)]
pub struct IdealStrategy {
    thresholds: FxHashMap<WifiMode, f64>,
    pub(super) stations: StationMap<IdealStation>,
}

/// The last SNR observed from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IdealStation {
    last_snr: f64,
}

impl IdealStation {
    #[must_use]
    pub fn last_snr(&self) -> f64 {
        self.last_snr
    }
}

impl IdealStrategy {
    /// Precomputes the SNR threshold of every mode at [`TARGET_BER`].
    #[must_use]
    pub fn new(modes: &[WifiMode], model: &dyn ErrorRateModel) -> Self {
        let thresholds = modes
            .iter()
            .map(|mode| (*mode, model.snr_threshold(mode, TARGET_BER)))
            .collect::<FxHashMap<_, _>>();
        for (mode, t) in &thresholds {
            tracing::trace!(%mode, threshold = t, "ideal snr threshold");
        }
        Self {
            thresholds,
            stations: StationMap::default(),
        }
    }

    /// The precomputed threshold of `mode`.
    #[must_use]
    pub fn threshold(&self, mode: &WifiMode) -> Option<f64> {
        self.thresholds.get(mode).copied()
    }

    #[must_use]
    pub fn get(&self, peer: MacAddress) -> Option<&IdealStation> {
        self.stations.get(&peer)
    }

    pub(super) fn station(&mut self, peer: MacAddress) -> &mut IdealStation {
        self.stations.entry(peer).or_default()
    }

    pub(super) fn observe(&mut self, peer: MacAddress, snr: f64) {
        self.station(peer).last_snr = snr;
    }

    pub(super) fn data_mode(&mut self, set: &RateSet, peer: MacAddress) -> WifiMode {
        let snr = self.station(peer).last_snr;
        self.select(set.modes(), snr, set.default_mode())
    }

    pub(super) fn rts_mode(&mut self, set: &RateSet, peer: MacAddress) -> WifiMode {
        let snr = self.station(peer).last_snr;
        self.select(set.basic_modes(), snr, set.default_mode())
    }

    /// The candidate with the highest positive threshold strictly below `snr`.
    fn select(&self, candidates: &[WifiMode], snr: f64, fallback: WifiMode) -> WifiMode {
        let mut best = (0.0, fallback);
        for mode in candidates {
            let threshold = self.thresholds.get(mode).copied().unwrap_or(f64::INFINITY);
            if threshold > best.0 && threshold < snr {
                best = (threshold, *mode);
            }
        }
        best.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mac::rate::{RateManager, RateManagerKind},
        phy::*,
    };

    /// Fixed thresholds for 6, 12 and 24 Mbps.
    struct Table;

    impl ErrorRateModel for Table {
        fn chunk_success_rate(&self, _: &WifiMode, _: f64, _: u64) -> f64 {
            1.0
        }

        fn snr_threshold(&self, mode: &WifiMode, _: f64) -> f64 {
            match mode.data_rate() {
                6_000_000 => 10.0,
                12_000_000 => 20.0,
                24_000_000 => 30.0,
                _ => 1000.0,
            }
        }
    }

    fn table_manager() -> RateManager {
        let set = RateSet::new(vec![OFDM_6MBPS, OFDM_12MBPS, OFDM_24MBPS], OFDM_6MBPS);
        RateManager::with_rate_set(RateManagerKind::Ideal, set, &Table)
    }

    #[test]
    fn picks_highest_threshold_below_snr() {
        let mut rm = table_manager();
        let peer = MacAddress::new(1);

        rm.report_data_ok(peer, 25.0);
        assert_eq!(rm.unicast_data_mode(peer), OFDM_12MBPS);
        rm.report_rts_ok(peer, 31.0);
        assert_eq!(rm.unicast_data_mode(peer), OFDM_24MBPS);
        assert_eq!(rm.rts_mode(peer), OFDM_24MBPS);

        // equal to a threshold is not enough
        rm.report_data_ok(peer, 20.0);
        assert_eq!(rm.unicast_data_mode(peer), OFDM_6MBPS);
    }

    #[test]
    fn unknown_peer_uses_default_mode() {
        let mut rm = table_manager();
        assert_eq!(rm.unicast_data_mode(MacAddress::new(5)), OFDM_6MBPS);
        rm.report_data_failed(MacAddress::new(5));
        assert_eq!(rm.unicast_data_mode(MacAddress::new(5)), OFDM_6MBPS);
    }

    #[test]
    fn nist_thresholds_follow_rates() {
        let mut rm = RateManager::new(RateManagerKind::Ideal, Standard::A, &NistErrorRateModel);
        let peer = MacAddress::new(3);

        rm.report_data_ok(peer, db_to_ratio(40.0));
        assert_eq!(rm.unicast_data_mode(peer), OFDM_54MBPS);
        rm.report_data_ok(peer, db_to_ratio(-5.0));
        assert_eq!(rm.unicast_data_mode(peer), OFDM_6MBPS);
    }
}
