use fxhash::FxHashMap;
use std::fmt::{Display, Write};

use crate::{mac::DropReason, time::Duration};

/// The counters of all MACs of one simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacMetrics {
    pub unicast_sent: u64,
    pub unicast_received: u64,
    pub unicast_resent: u64,
    pub unicast_dropped: u64,
    pub broadcast_sent: u64,
    pub broadcast_received: u64,
    pub broadcast_dropped: u64,

    pub unicast_bytes_sent: u64,
    pub unicast_bytes_received: u64,
    pub broadcast_bytes_sent: u64,
    pub broadcast_bytes_received: u64,

    pub cts_timeouts: u64,
    pub rx_drops: u64,
    /// Summed over delivered unicasts: the time from enqueueing to the
    /// start of the attempt that got through.
    pub queue_delay: Duration,
    pub drops: FxHashMap<DropReason, u64>,
}

impl MacMetrics {
    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        *self.drops.entry(reason).or_default() += 1;
    }

    /// The number of frames dropped for `reason`.
    #[must_use]
    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.drops.get(&reason).copied().unwrap_or_default()
    }

    /// The mean queue delay of delivered unicasts.
    #[must_use]
    pub fn mean_queue_delay(&self) -> Duration {
        match u32::try_from(self.unicast_received) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.queue_delay / n,
        }
    }

    /// A multi-line summary of all counters.
    #[must_use]
    pub fn report(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "unicast:   {} sent ({}), {} received ({}), {} resent, {} dropped",
            self.unicast_sent,
            readable_size(self.unicast_bytes_sent as f64),
            self.unicast_received,
            readable_size(self.unicast_bytes_received as f64),
            self.unicast_resent,
            self.unicast_dropped,
        );
        let _ = writeln!(
            s,
            "broadcast: {} sent ({}), {} received ({}), {} dropped",
            self.broadcast_sent,
            readable_size(self.broadcast_bytes_sent as f64),
            self.broadcast_received,
            readable_size(self.broadcast_bytes_received as f64),
            self.broadcast_dropped,
        );
        let _ = writeln!(
            s,
            "medium:    {} cts timeouts, {} rx drops",
            self.cts_timeouts, self.rx_drops
        );
        let _ = writeln!(
            s,
            "queueing:  {:?} mean delay of delivered unicasts",
            self.mean_queue_delay()
        );

        let mut drops = self.drops.iter().collect::<Vec<_>>();
        drops.sort_by_key(|(reason, _)| reason.to_string());
        for (reason, count) in drops {
            let _ = writeln!(s, "drop:      {reason} x {count}");
        }
        s
    }
}

impl Display for MacMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.report())
    }
}

/// Renders a byte count with a binary unit, e.g. `1.5 KB`.
#[must_use]
pub fn readable_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes <= 0.0 {
        return "0".to_string();
    }
    let group = ((bytes.log10() / 1024f64.log10()) as usize).min(UNITS.len() - 1);
    let value = bytes / 1024f64.powi(group as i32);
    let value = format!("{value:.1}");
    let value = value.strip_suffix(".0").unwrap_or(&value);
    format!("{value} {}", UNITS[group])
}
