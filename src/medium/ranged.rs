use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::{Medium, Signal, Transfer};
use crate::{
    mac::{ExchangeId, MacAddress},
    phy::{
        db_to_ratio, dbm_to_w, plcp_header_duration, plcp_header_mode, plcp_preamble_duration,
        ErrorRateModel, LogDistanceLoss, NistErrorRateModel, WifiMode,
    },
    time::{Duration, SimTime},
};

const BOLTZMANN: f64 = 1.3803e-23;
const NOISE_TEMPERATURE: f64 = 290.0;

/// A position in the plane, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The radio parameters of a [`RangedMedium`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioParameters {
    pub tx_power_dbm: f64,
    pub tx_gain_db: f64,
    pub rx_gain_db: f64,
    pub noise_figure_db: f64,
    /// The weakest signal that can be decoded.
    pub rx_sensitivity_dbm: f64,
    /// The weakest signal that marks the medium as busy.
    pub carrier_sense_dbm: f64,
    /// Signals below this level are not considered as interference.
    pub attention_dbm: f64,
}

impl Default for RadioParameters {
    fn default() -> Self {
        Self {
            tx_power_dbm: 16.0206,
            tx_gain_db: 1.0,
            rx_gain_db: 1.0,
            noise_figure_db: 7.0,
            rx_sensitivity_dbm: -96.0,
            carrier_sense_dbm: -99.0,
            attention_dbm: -120.0,
        }
    }
}

#[derive(Debug, Clone)]
struct SignalRecord {
    signal: Signal,
    position: Position,
    transfer: Option<Transfer>,
}

/// A medium of static nodes, where reception only depends on the
/// distance between sender and receiver.
///
/// Signal records are kept for a retention period after they ended, so
/// that transfers can still be evaluated against every signal that
/// overlapped them.
#[derive(Debug)]
pub struct RangedMedium {
    positions: FxHashMap<MacAddress, Position>,
    nodes: Vec<MacAddress>,
    loss: LogDistanceLoss,
    radio: RadioParameters,
    model: NistErrorRateModel,
    retention: Duration,
    signals: Vec<SignalRecord>,
}

impl RangedMedium {
    /// The time a signal record is kept after its end.
    pub const DEFAULT_RETENTION: Duration = Duration::from_millis(100);

    #[must_use]
    pub fn new(loss: LogDistanceLoss, radio: RadioParameters) -> Self {
        Self {
            positions: FxHashMap::default(),
            nodes: Vec::new(),
            loss,
            radio,
            model: NistErrorRateModel,
            retention: Self::DEFAULT_RETENTION,
            signals: Vec::new(),
        }
    }

    /// Adds a node, or moves an existing one.
    pub fn place(&mut self, node: MacAddress, position: Position) {
        if self.positions.insert(node, position).is_none() {
            let i = self.nodes.partition_point(|n| *n < node);
            self.nodes.insert(i, node);
        }
    }

    #[must_use]
    pub fn position(&self, node: MacAddress) -> Option<Position> {
        self.positions.get(&node).copied()
    }

    #[must_use]
    pub fn radio(&self) -> &RadioParameters {
        &self.radio
    }

    /// The number of signal records currently retained.
    #[must_use]
    pub fn num_signals(&self) -> usize {
        self.signals.len()
    }

    /// The distance up to which frames can be decoded.
    #[must_use]
    pub fn link_range(&self) -> f64 {
        self.loss.max_distance(
            self.radio.tx_power_dbm + self.radio.tx_gain_db + self.radio.rx_gain_db,
            self.radio.rx_sensitivity_dbm,
        )
    }

    /// The distance up to which energy is sensed.
    #[must_use]
    pub fn carrier_sense_range(&self) -> f64 {
        self.loss.max_distance(
            self.radio.tx_power_dbm + self.radio.tx_gain_db + self.radio.rx_gain_db,
            self.radio.carrier_sense_dbm,
        )
    }

    fn rx_power_dbm(&self, tx_power_dbm: f64, from: Position, to: Position) -> f64 {
        tx_power_dbm + self.radio.tx_gain_db + self.radio.rx_gain_db
            - self.loss.loss_db(from.distance(&to))
    }

    fn noise_floor_w(&self, mode: WifiMode) -> f64 {
        db_to_ratio(self.radio.noise_figure_db)
            * BOLTZMANN
            * NOISE_TEMPERATURE
            * f64::from(mode.bandwidth())
    }

    fn locate(&self, node: MacAddress) -> Position {
        self.positions
            .get(&node)
            .copied()
            .unwrap_or_else(|| panic!("node {node} is not placed on the medium"))
    }

    fn within(&self, node: MacAddress, threshold_dbm: f64) -> Vec<MacAddress> {
        let origin = self.locate(node);
        self.nodes
            .iter()
            .filter(|n| **n != node)
            .filter(|n| {
                self.rx_power_dbm(self.radio.tx_power_dbm, origin, self.positions[*n])
                    >= threshold_dbm
            })
            .copied()
            .collect()
    }

    /// The interference power in watt at `at`, contributed by `record`.
    fn interference_w(&self, record: &SignalRecord, at: Position) -> f64 {
        let dbm = self.rx_power_dbm(record.signal.tx_power_dbm, record.position, at);
        if dbm < self.radio.attention_dbm {
            0.0
        } else {
            dbm_to_w(dbm)
        }
    }

    fn record(&mut self, signal: Signal, transfer: Option<Transfer>) {
        let now = SimTime::now();
        let retention = self.retention;
        let before = self.signals.len();
        self.signals
            .retain(|r| r.signal.end + retention >= now);
        if self.signals.len() < before {
            trace!("pruned {} expired signals", before - self.signals.len());
        }

        let position = self.locate(signal.source);
        self.signals.push(SignalRecord {
            signal,
            position,
            transfer,
        });
    }
}

impl Medium for RangedMedium {
    fn neighbors(&self, node: MacAddress) -> Vec<MacAddress> {
        self.within(node, self.radio.rx_sensitivity_dbm)
    }

    fn carrier_sense_neighbors(&self, node: MacAddress) -> Vec<MacAddress> {
        self.within(node, self.radio.carrier_sense_dbm)
    }

    fn has_link(&self, from: MacAddress, to: MacAddress) -> bool {
        match (self.positions.get(&from), self.positions.get(&to)) {
            (Some(a), Some(b)) if from != to => {
                self.rx_power_dbm(self.radio.tx_power_dbm, *a, *b)
                    >= self.radio.rx_sensitivity_dbm
            }
            _ => false,
        }
    }

    fn add_transfer(&mut self, signal: Signal, transfer: Transfer) {
        self.record(signal, Some(transfer));
    }

    fn add_interference(&mut self, signal: Signal) {
        self.record(signal, None);
    }

    fn packet_error_rate(&self, exchange: ExchangeId, receiver: MacAddress) -> f64 {
        let Some((index, record, transfer)) = self
            .signals
            .iter()
            .enumerate()
            .find_map(|(i, r)| match r.transfer {
                Some(t) if t.exchange == exchange => Some((i, r, t)),
                _ => None,
            })
        else {
            warn!("no transfer registered for exchange {exchange}");
            return 1.0;
        };

        let at = self.locate(receiver);
        let signal = record.signal;
        let rx_w = dbm_to_w(self.rx_power_dbm(signal.tx_power_dbm, record.position, at));

        let interferers: Vec<(Signal, f64)> = self
            .signals
            .iter()
            .enumerate()
            .filter(|(i, r)| *i != index && r.signal.overlaps(&signal))
            .map(|(_, r)| (r.signal, self.interference_w(r, at)))
            .filter(|(_, w)| *w > 0.0)
            .collect();

        let header_start = signal.start + plcp_preamble_duration(transfer.mode, transfer.preamble);
        let payload_start =
            header_start + plcp_header_duration(transfer.mode, transfer.preamble);
        let header_mode = plcp_header_mode(transfer.mode, transfer.preamble);

        let mut points = vec![signal.start, header_start, payload_start, signal.end];
        for (s, _) in &interferers {
            points.push(s.start);
            points.push(s.end);
        }
        points.retain(|t| *t >= signal.start && *t <= signal.end);
        points.sort_unstable();
        points.dedup();

        let mut psr = 1.0;
        for chunk in points.windows(2) {
            let (from, to) = (chunk[0], chunk[1]);
            if from < header_start {
                continue;
            }
            let mode = if from < payload_start {
                header_mode
            } else {
                transfer.mode
            };

            let interference_w: f64 = interferers
                .iter()
                .filter(|(s, _)| s.start <= from && from < s.end)
                .map(|(_, w)| w)
                .sum();
            let snr = rx_w / (self.noise_floor_w(mode) + interference_w);

            let nbits = (mode.phy_rate() as f64 * (to - from).as_secs_f64()) as u64;
            psr *= self.model.chunk_success_rate(&mode, snr, nbits);
        }

        1.0 - psr
    }

    fn snr(&self, from: MacAddress, to: MacAddress, mode: WifiMode, tx_power_dbm: f64) -> f64 {
        let (a, b) = (self.locate(from), self.locate(to));
        let rx_w = dbm_to_w(self.rx_power_dbm(tx_power_dbm, a, b));

        let now = SimTime::now();
        let interference_w: f64 = self
            .signals
            .iter()
            .filter(|r| r.signal.start <= now && now < r.signal.end)
            .map(|r| self.interference_w(r, b))
            .sum();

        rx_w / (self.noise_floor_w(mode) + interference_w)
    }
}
