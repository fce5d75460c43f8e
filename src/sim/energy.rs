use fxhash::FxHashMap;

use crate::{mac::FrameKind, mac::MacAddress, time::Duration};

/// Receives the airtime of every frame sent or received by a node.
pub trait EnergySink {
    /// `node` put a frame on the air.
    fn send(&mut self, node: MacAddress, duration: Duration, frame: FrameKind, broadcast: bool);

    /// `node` listened to a frame, which may or may not have been decoded.
    fn receive(
        &mut self,
        node: MacAddress,
        duration: Duration,
        frame: FrameKind,
        broadcast: bool,
        success: bool,
    );

    /// The accumulated statistics of `node`.
    fn stats(&self, node: MacAddress) -> EnergyStats {
        let _ = node;
        EnergyStats::default()
    }
}

/// Airtime and frame counts of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnergyStats {
    pub tx_time: Duration,
    pub rx_time: Duration,
    pub tx_frames: usize,
    pub rx_frames: usize,
    pub rx_failures: usize,
}

/// The default [`EnergySink`], which accounts airtime per node.
#[derive(Debug, Clone, Default)]
pub struct EnergyLedger {
    nodes: FxHashMap<MacAddress, EnergyStats>,
}

impl EnergyLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The total airtime spent sending, over all nodes.
    #[must_use]
    pub fn total_tx_time(&self) -> Duration {
        self.nodes.values().map(|s| s.tx_time).sum()
    }
}

impl EnergySink for EnergyLedger {
    fn send(&mut self, node: MacAddress, duration: Duration, _: FrameKind, _: bool) {
        let stats = self.nodes.entry(node).or_default();
        stats.tx_time += duration;
        stats.tx_frames += 1;
    }

    fn receive(
        &mut self,
        node: MacAddress,
        duration: Duration,
        _: FrameKind,
        _: bool,
        success: bool,
    ) {
        let stats = self.nodes.entry(node).or_default();
        stats.rx_time += duration;
        stats.rx_frames += 1;
        if !success {
            stats.rx_failures += 1;
        }
    }

    fn stats(&self, node: MacAddress) -> EnergyStats {
        self.nodes.get(&node).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::micros;

    #[test]
    fn ledger_accumulates() {
        let a = MacAddress::new(1);
        let mut ledger = EnergyLedger::new();
        ledger.send(a, micros(100), FrameKind::Rts, false);
        ledger.send(a, micros(50), FrameKind::Data(100), true);
        ledger.receive(a, micros(20), FrameKind::Ack, false, false);

        let stats = ledger.stats(a);
        assert_eq!(stats.tx_time, micros(150));
        assert_eq!(stats.tx_frames, 2);
        assert_eq!(stats.rx_failures, 1);
        assert_eq!(ledger.stats(MacAddress::new(2)), EnergyStats::default());
        assert_eq!(ledger.total_tx_time(), micros(150));
    }
}
