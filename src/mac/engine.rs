use rand::Rng;

use super::{
    rate::RateManager, ConfigError, DcfManager, DropReason, Dropped, ExchangeId, LinkFrame,
    LruCache, MacAddress, MacConfig, OutboundQueue, QueueEntry, WifiState, ACK_CACHE_CAPACITY,
    FCS_SIZE,
};
use crate::{
    phy::{ErrorRateModel, Preamble, Standard},
    time::SimTime,
};

/// The three ways a frame can be put on the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    /// DATA without acknowledgement, to all neighbors.
    Broadcast,
    /// DATA and ACK.
    DirectUnicast,
    /// RTS, CTS, DATA and ACK.
    RtsCtsUnicast,
}

/// The state of the MAC of one simulated network interface.
///
/// The engine owns the medium access state, the rate manager and the
/// outbound queue. The frame exchanges themselves involve several nodes
/// and the medium, and are driven by the simulation.
#[derive(Debug)]
pub struct MacEngine {
    address: MacAddress,
    standard: Standard,
    tx_power_dbm: f64,
    rts_cts_threshold: u32,
    max_retransmissions: u32,
    preamble: Preamble,

    pub(crate) dcf: DcfManager,
    pub(crate) rate: RateManager,
    pub(crate) queue: OutboundQueue,
    pub(crate) ack_cache: LruCache<ExchangeId>,

    current: Option<QueueEntry>,
    current_exchange: Option<ExchangeId>,
    retry_count: u32,

    slot_pending: bool,
    slot_epoch: u64,
    online: bool,
}

impl MacEngine {
    /// Creates an online MAC.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid. A MAC never runs half configured.
    pub fn new(
        address: MacAddress,
        config: &MacConfig,
        model: &dyn ErrorRateModel,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rate = RateManager::new(config.rate_manager_kind()?, config.standard, model);
        if let Some(mode) = config.broadcast_data_mode()? {
            rate.set_broadcast_data_mode(mode);
        }

        Ok(Self {
            address,
            standard: config.standard,
            tx_power_dbm: config.tx_power_dbm,
            rts_cts_threshold: config.rts_cts_threshold,
            max_retransmissions: config.max_retransmissions,
            preamble: Preamble::Long,

            dcf: DcfManager::new(config.standard.dcf_parameters()),
            rate,
            queue: OutboundQueue::new(config.max_queue_length, config.queue_timeout()?),
            ack_cache: LruCache::new(ACK_CACHE_CAPACITY),

            current: None,
            current_exchange: None,
            retry_count: 0,

            slot_pending: false,
            slot_epoch: 0,
            online: true,
        })
    }

    #[must_use]
    pub fn address(&self) -> MacAddress {
        self.address
    }

    #[must_use]
    pub fn standard(&self) -> Standard {
        self.standard
    }

    #[must_use]
    pub fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    #[must_use]
    pub fn preamble(&self) -> Preamble {
        self.preamble
    }

    #[must_use]
    pub fn max_retransmissions(&self) -> u32 {
        self.max_retransmissions
    }

    #[must_use]
    pub fn dcf(&self) -> &DcfManager {
        &self.dcf
    }

    #[must_use]
    pub fn rate_manager(&self) -> &RateManager {
        &self.rate
    }

    #[must_use]
    pub fn state(&self) -> WifiState {
        self.dcf.state()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// The retries of the current frame.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The frame currently handled, if any.
    #[must_use]
    pub fn current(&self) -> Option<&QueueEntry> {
        self.current.as_ref()
    }

    /// Whether `id` is the latest send attempt of the current frame.
    #[must_use]
    pub fn is_current_exchange(&self, id: ExchangeId) -> bool {
        self.current.is_some() && self.current_exchange == Some(id)
    }

    #[must_use]
    pub fn slot_epoch(&self) -> u64 {
        self.slot_epoch
    }

    /// Hands a frame to the MAC. Returns the frames dropped on the way.
    pub fn enqueue(&mut self, frame: LinkFrame) -> Dropped {
        if !self.online {
            return vec![(frame, DropReason::SendingMacOffline)];
        }
        self.queue.push(frame)
    }

    /// Makes the queue head the current frame and resets the retry counter.
    pub fn advance(&mut self) -> Dropped {
        let (entry, dropped) = self.queue.pop();
        self.current = entry;
        self.current_exchange = None;
        self.retry_count = 0;
        dropped
    }

    /// Abandons the current frame.
    pub fn clear_current(&mut self) -> Option<LinkFrame> {
        self.current_exchange = None;
        self.current.take().map(|e| e.frame)
    }

    /// Records a new send attempt of the current frame.
    ///
    /// # Panics
    ///
    /// Panics if there is no current frame.
    pub fn start_exchange(&mut self, id: ExchangeId) -> &QueueEntry {
        self.current_exchange = Some(id);
        self.current
            .as_ref()
            .expect("a send attempt requires a current frame")
    }

    /// Counts a failed attempt. Returns whether another retry is allowed.
    pub fn register_failure(&mut self) -> bool {
        self.retry_count += 1;
        self.dcf.increase_cw();
        self.retry_count <= self.max_retransmissions
    }

    /// The exchange used for a frame, based on its size and destination.
    #[must_use]
    pub fn exchange_kind(&self, frame: &LinkFrame) -> ExchangeKind {
        if frame.is_broadcast() {
            ExchangeKind::Broadcast
        } else if frame.size() + FCS_SIZE < self.rts_cts_threshold {
            ExchangeKind::DirectUnicast
        } else {
            ExchangeKind::RtsCtsUnicast
        }
    }

    /// Restarts the backoff and returns the slot epoch and the time at
    /// which the slot should be claimed.
    ///
    /// # Panics
    ///
    /// Panics if another slot acquisition is still pending.
    pub fn begin_slot_acquisition(&mut self, rng: &mut impl Rng) -> (u64, SimTime) {
        assert!(
            !self.slot_pending,
            "two slot acquisitions for {}: a station cannot send two frames at once",
            self.address
        );
        self.dcf.reset_backoff();
        self.dcf.start_backoff(rng);
        self.slot_pending = true;
        (self.slot_epoch, self.dcf.backoff_end())
    }

    /// Consumes the pending slot acquisition of `epoch`. Returns `false`
    /// for acquisitions invalidated by going offline.
    pub fn claim_slot(&mut self, epoch: u64) -> bool {
        if epoch != self.slot_epoch {
            return false;
        }
        self.slot_pending = false;
        true
    }

    /// Marks a rescheduled acquisition of the current epoch as pending.
    pub fn defer_slot(&mut self) -> u64 {
        self.slot_pending = true;
        self.slot_epoch
    }

    /// Disconnects the MAC. The queue and the current frame are dropped,
    /// pending slot acquisitions become invalid.
    pub fn go_offline(&mut self) -> Dropped {
        self.online = false;
        self.slot_pending = false;
        self.slot_epoch += 1;
        self.dcf.stop_backoff();
        self.retry_count = 0;

        let mut dropped: Dropped = self
            .clear_current()
            .into_iter()
            .chain(self.queue.drain())
            .map(|frame| (frame, DropReason::SendingMacOffline))
            .collect();
        dropped.shrink_to_fit();
        dropped
    }

    pub fn go_online(&mut self) {
        self.online = true;
    }
}
