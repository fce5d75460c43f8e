use super::{RateSet, StationMap};
use crate::{mac::MacAddress, phy::WifiMode};

/// Consecutive successes before probing the next higher rate.
pub const SUCCESS_THRESHOLD: u32 = 10;
/// Transmissions without a rate change before probing the next higher rate.
pub const TIMER_THRESHOLD: u32 = 15;

/// Automatic rate fallback.
#[derive(Debug, Clone, Default)]
pub struct ArfStrategy {
    pub(super) stations: StationMap<ArfStation>,
}

impl ArfStrategy {
    pub(super) fn station(&mut self, peer: MacAddress) -> &mut ArfStation {
        self.stations.entry(peer).or_default()
    }

    /// The record of `peer`, if it was ever contacted.
    #[must_use]
    pub fn get(&self, peer: MacAddress) -> Option<&ArfStation> {
        self.stations.get(&peer)
    }

    pub(super) fn data_mode(&mut self, set: &RateSet, peer: MacAddress) -> WifiMode {
        set.mode(self.station(peer).rate_index)
    }

    /// The fastest basic mode that is not faster than the data mode.
    pub(super) fn rts_mode(&mut self, set: &RateSet, peer: MacAddress) -> WifiMode {
        let data = self.data_mode(set, peer);
        set.basic_modes()
            .iter()
            .copied()
            .filter(|m| *m <= data)
            .fold(set.default_mode(), |best, m| best.max(m))
    }
}

/// The ARF state of one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArfStation {
    rate_index: usize,
    timer: u32,
    success_count: u32,
    retry_count: u32,
    recovering: bool,
}

impl ArfStation {
    /// The index of the current data mode within the sorted rate set.
    #[must_use]
    pub fn rate_index(&self) -> usize {
        self.rate_index
    }

    /// Whether the last rate increase is still unconfirmed.
    #[must_use]
    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Processes an acknowledged data frame. `num_modes` bounds the rate index.
    pub fn on_data_ok(&mut self, num_modes: usize) {
        self.timer += 1;
        self.success_count += 1;
        self.recovering = false;
        self.retry_count = 0;

        let probe = self.success_count == SUCCESS_THRESHOLD || self.timer == TIMER_THRESHOLD;
        if probe && self.rate_index + 1 < num_modes {
            self.rate_index += 1;
            self.timer = 0;
            self.success_count = 0;
            self.recovering = true;
            tracing::trace!(rate_index = self.rate_index, "arf probes a higher rate");
        }
    }

    /// Processes a missing acknowledgement.
    pub fn on_data_failed(&mut self) {
        self.timer += 1;
        self.retry_count += 1;
        self.success_count = 0;

        if self.recovering {
            // the probed rate failed right away
            if self.retry_count == 1 {
                self.rate_index = self.rate_index.saturating_sub(1);
            }
            self.timer = 0;
        } else {
            if (self.retry_count - 1) % 2 == 1 {
                self.rate_index = self.rate_index.saturating_sub(1);
            }
            if self.retry_count >= 2 {
                self.timer = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mac::rate::{RateManager, RateManagerKind, RateStrategy},
        phy::*,
    };

    #[test]
    fn success_threshold_steps_up_once() {
        let mut s = ArfStation::default();
        for _ in 0..SUCCESS_THRESHOLD - 1 {
            s.on_data_ok(8);
            assert_eq!(s.rate_index(), 0);
        }
        s.on_data_ok(8);
        assert_eq!(s.rate_index(), 1);
        assert!(s.is_recovering());
    }

    #[test]
    fn ceiling_is_respected() {
        let mut s = ArfStation::default();
        for _ in 0..100 {
            s.on_data_ok(2);
        }
        assert_eq!(s.rate_index(), 1);
    }

    #[test]
    fn failure_while_recovering_falls_back() {
        let mut s = ArfStation::default();
        for _ in 0..SUCCESS_THRESHOLD {
            s.on_data_ok(8);
        }
        assert!(s.is_recovering());
        s.on_data_failed();
        assert_eq!(s.rate_index(), 0);

        // floor at zero
        let mut s = ArfStation {
            recovering: true,
            ..Default::default()
        };
        s.on_data_failed();
        assert_eq!(s.rate_index(), 0);
    }

    #[test]
    fn normal_fallback_on_every_second_retry() {
        let mut s = ArfStation {
            rate_index: 5,
            ..Default::default()
        };
        let mut indices = Vec::new();
        for _ in 0..5 {
            s.on_data_failed();
            indices.push(s.rate_index());
        }
        assert_eq!(indices, [5, 4, 4, 3, 3]);
        assert_eq!(s.retry_count(), 5);

        s.on_data_ok(8);
        assert_eq!(s.retry_count(), 0);
    }

    #[test]
    fn timer_threshold_steps_up() {
        let mut s = ArfStation {
            rate_index: 3,
            ..Default::default()
        };
        s.on_data_failed();
        for _ in 0..9 {
            s.on_data_ok(8);
        }
        // a single failure resets the success count but not the timer
        s.on_data_failed();
        for _ in 0..3 {
            s.on_data_ok(8);
        }
        assert_eq!(s.rate_index(), 3);
        s.on_data_ok(8);
        assert_eq!(s.rate_index(), 4);
        assert!(s.is_recovering());
    }

    #[test]
    fn rts_uses_basic_modes() {
        let mut rm = RateManager::new(RateManagerKind::Arf, Standard::A, &NistErrorRateModel);
        let peer = MacAddress::new(9);
        rm.add_basic_mode(OFDM_12MBPS);
        rm.add_basic_mode(OFDM_24MBPS);

        for _ in 0..SUCCESS_THRESHOLD * 3 {
            rm.report_data_ok(peer, 0.0);
        }
        assert_eq!(rm.unicast_data_mode(peer), OFDM_18MBPS);
        assert_eq!(rm.rts_mode(peer), OFDM_12MBPS);

        let RateStrategy::Arf(arf) = rm.strategy() else {
            panic!("expected arf")
        };
        assert_eq!(arf.get(peer).map(ArfStation::rate_index), Some(3));
    }
}
