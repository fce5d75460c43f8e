//! Medium access bookkeeping of the distributed coordination function.
//!
//! The [`DcfManager`] never stores a "current state". It records when each
//! kind of medium activity ends and derives the [`WifiState`] from these
//! timestamps whenever it is asked.

use rand::Rng;
use std::fmt::Display;

use crate::{
    phy::DcfParameters,
    time::{Duration, SimTime},
};

/// The medium state of a MAC, as derived by [`DcfManager::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WifiState {
    /// The medium is free.
    Idle,
    /// The physical carrier sense reports a busy medium.
    CcaBusy,
    /// The virtual carrier sense (NAV) reserves the medium.
    Nav,
    /// The MAC is receiving.
    Rx,
    /// The MAC is transmitting.
    Tx,
    /// The MAC waits in vain for a CTS.
    CtsTimeout,
}

impl Display for WifiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::CcaBusy => "CCA_BUSY",
            Self::Nav => "NAV",
            Self::Rx => "RX",
            Self::Tx => "TX",
            Self::CtsTimeout => "CTS_TIMEOUT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BackoffTimer {
    end: SimTime,
    running: bool,
    /// Set once the timer expired at the current instant while another
    /// event changed the medium at that same instant.
    ignore_state: bool,
    last_idle_start: SimTime,
}

impl Default for BackoffTimer {
    fn default() -> Self {
        Self {
            end: SimTime::ZERO,
            running: false,
            ignore_state: false,
            last_idle_start: SimTime::ZERO,
        }
    }
}

/// Per-node medium state and backoff arithmetic.
#[derive(Debug, Clone)]
pub struct DcfManager {
    params: DcfParameters,
    cw: u32,

    tx_start: Option<SimTime>,
    tx_end: SimTime,
    rx_start: Option<SimTime>,
    rx_end: SimTime,
    nav_end: SimTime,
    cca_end: SimTime,
    cts_timeout_end: SimTime,

    backoff: BackoffTimer,
}

impl DcfManager {
    /// Creates a manager with an idle medium and `cw = cw_min`.
    #[must_use]
    pub fn new(params: DcfParameters) -> Self {
        assert!(
            params.cw_min <= params.cw_max,
            "cw_min {} exceeds cw_max {}",
            params.cw_min,
            params.cw_max
        );
        Self {
            params,
            cw: params.cw_min,
            tx_start: None,
            tx_end: SimTime::ZERO,
            rx_start: None,
            rx_end: SimTime::ZERO,
            nav_end: SimTime::ZERO,
            cca_end: SimTime::ZERO,
            cts_timeout_end: SimTime::ZERO,
            backoff: BackoffTimer::default(),
        }
    }

    /// The timing parameters in use.
    #[must_use]
    pub fn params(&self) -> &DcfParameters {
        &self.params
    }

    /// The current contention window.
    #[must_use]
    pub fn cw(&self) -> u32 {
        self.cw
    }

    pub fn sifs(&self) -> Duration {
        self.params.sifs
    }

    pub fn difs(&self) -> Duration {
        self.params.difs
    }

    pub fn cts_timeout(&self) -> Duration {
        self.params.cts_timeout
    }

    /// The start of the last own transmission.
    #[must_use]
    pub fn tx_start(&self) -> Option<SimTime> {
        self.tx_start
    }

    /// The start of the last reception.
    #[must_use]
    pub fn rx_start(&self) -> Option<SimTime> {
        self.rx_start
    }

    /// Derives the medium state at the current instant.
    ///
    /// Precedence: `TX > RX > NAV > CCA_BUSY > CTS_TIMEOUT > IDLE`.
    #[must_use]
    pub fn state(&self) -> WifiState {
        let now = SimTime::now();
        if self.tx_end > now {
            WifiState::Tx
        } else if self.rx_end > now {
            WifiState::Rx
        } else if self.nav_end > now {
            WifiState::Nav
        } else if self.cca_end > now {
            WifiState::CcaBusy
        } else if self.cts_timeout_end > now {
            WifiState::CtsTimeout
        } else {
            WifiState::Idle
        }
    }

    /// Whether the MAC is transmitting or receiving right now.
    #[must_use]
    pub fn is_tx_or_rx(&self) -> bool {
        matches!(self.state(), WifiState::Tx | WifiState::Rx)
    }

    /// The time until the medium has been idle for DIFS, zero if it allready is.
    #[must_use]
    pub fn time_to_idle(&self) -> Duration {
        let busy_until = self
            .tx_end
            .max(self.rx_end)
            .max(self.nav_end)
            .max(self.cca_end)
            .max(self.cts_timeout_end);
        (busy_until + self.params.difs).saturating_duration_since(SimTime::now())
    }

    pub fn reset_cw(&mut self) {
        self.cw = self.params.cw_min;
    }

    /// Grows the contention window to `2 * (cw + 1) - 1`, capped at `cw_max`.
    pub fn increase_cw(&mut self) {
        self.cw = (2 * (self.cw + 1) - 1).min(self.params.cw_max);
    }

    /// Whether a backoff timer is currently running.
    #[must_use]
    pub fn is_backoff_running(&self) -> bool {
        self.backoff.running
    }

    /// Whether the timer expired at an instant where the medium state
    /// changed due to another event.
    #[must_use]
    pub fn ignores_state(&self) -> bool {
        self.backoff.ignore_state
    }

    /// Starts the backoff timer. Returns `false` without any effect if a
    /// timer is allready running.
    ///
    /// The backoff is skipped if the medium is free and the last own
    /// transmission ended more than one contention window ago.
    pub fn start_backoff(&mut self, rng: &mut impl Rng) -> bool {
        if self.backoff.running {
            return false;
        }

        let now = SimTime::now();
        self.backoff.last_idle_start = now + self.time_to_idle();

        self.backoff.end = if self.is_medium_free() && !self.has_sent_in_last_cw() {
            self.backoff.last_idle_start
        } else {
            let slots = rng.random_range(0..self.cw.max(1));
            self.backoff.last_idle_start + self.params.slot * slots
        };
        self.backoff.running = true;

        tracing::trace!(
            cw = self.cw,
            end = %self.backoff.end,
            "backoff started"
        );
        true
    }

    /// Clears the running and the ignore-state flag.
    pub fn reset_backoff(&mut self) {
        self.backoff.end = SimTime::ZERO;
        self.backoff.running = false;
        self.backoff.ignore_state = false;
    }

    pub fn stop_backoff(&mut self) {
        self.reset_backoff();
    }

    /// The instant the running backoff expires.
    ///
    /// # Panics
    ///
    /// Panics if no timer is running, or if the timer expires now while
    /// the medium is busy and the ignore-state flag is unset.
    #[must_use]
    pub fn backoff_end(&self) -> SimTime {
        assert!(
            self.backoff.running,
            "backoff timer is not running: start the timer before querying its end"
        );
        assert!(
            self.backoff.ignore_state
                || self.backoff.end != SimTime::now()
                || self.state() == WifiState::Idle,
            "backoff expires now, but the medium is {}",
            self.state()
        );
        self.backoff.end
    }

    /// Records an own transmission starting now.
    ///
    /// # Panics
    ///
    /// Panics if the previous transmission has not yet ended.
    pub fn notify_tx(&mut self, duration: Duration) {
        let now = SimTime::now();
        assert!(
            self.tx_end <= now,
            "two transmissions at the same time: tx busy until {}",
            self.tx_end
        );
        self.tx_start = Some(now);
        self.tx_end = now + duration;
        self.update_backoff(duration);
    }

    /// Records a reception starting now.
    ///
    /// # Panics
    ///
    /// Panics if the previous reception has not yet ended.
    pub fn notify_rx(&mut self, duration: Duration) {
        let now = SimTime::now();
        assert!(
            self.rx_end <= now,
            "two receptions at the same time: rx busy until {}",
            self.rx_end
        );
        self.rx_start = Some(now);
        self.rx_end = now + duration;
        self.update_backoff(duration);
    }

    /// Extends the NAV to at least `now + duration`.
    pub fn notify_nav(&mut self, duration: Duration) {
        self.nav_end = self.nav_end.max(SimTime::now() + duration);
        self.update_backoff(duration);
    }

    /// Extends the physical busy period to at least `now + duration`.
    pub fn notify_cca(&mut self, duration: Duration) {
        self.cca_end = self.cca_end.max(SimTime::now() + duration);
        self.update_backoff(duration);
    }

    /// Starts waiting for a CTS that will never arrive.
    pub fn notify_cts_timeout(&mut self) {
        let duration = self.params.cts_timeout;
        self.cts_timeout_end = SimTime::now() + duration;
        self.update_backoff(duration);
    }

    /// Applies the EIFS penalty after a failed reception.
    pub fn notify_rx_drop(&mut self) {
        let penalty = self.params.eifs.saturating_sub(self.params.difs);
        self.update_backoff(penalty);
    }

    fn is_medium_free(&self) -> bool {
        self.state() == WifiState::Idle && self.time_to_idle().is_zero()
    }

    fn has_sent_in_last_cw(&self) -> bool {
        self.tx_end + self.params.slot * self.cw > SimTime::now()
    }

    /// Extends a running backoff by the overlap of a new busy period with
    /// the idle horizon known so far.
    fn update_backoff(&mut self, duration: Duration) {
        if !self.backoff.running {
            return;
        }

        let now = SimTime::now();
        if self.backoff.end == now {
            self.backoff.ignore_state = true;
            return;
        }

        let duration = duration + self.params.difs;
        let idle_start = now + self.time_to_idle();
        let diff = idle_start.saturating_duration_since(self.backoff.last_idle_start);
        self.backoff.last_idle_start = idle_start;

        self.backoff.end += diff.min(duration);
    }
}
