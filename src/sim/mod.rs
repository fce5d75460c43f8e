//!
//! The simulation of a set of 802.11 ad-hoc MACs sharing one medium.
//!
//! [`WifiSim`] is the runtime application. It owns all [`MacEngine`]s,
//! the [`Medium`], the energy accounting and the metrics, and routes the
//! events of [`WifiEvent`] to the frame exchange procedures.
//!

use fxhash::FxHashMap;
use tracing::{info, trace, warn};

use crate::{
    logger,
    mac::{
        ConfigError, ConfigErrorKind, Destination, ExchangeId, FrameExchange, LinkFrame, MacAddress,
        MacConfig, MacEngine,
    },
    medium::Medium,
    phy::NistErrorRateModel,
    runtime::{Application, Event, EventLifecycle, EventSet, Runtime, RuntimeError},
    time::{Duration, SimTime},
};

mod energy;
pub use energy::*;

mod exchange;

mod inbox;
pub use inbox::*;

mod metrics;
pub use metrics::*;

mod scenario;
pub use scenario::*;

/// The runtime application of a MAC layer simulation.
pub struct WifiSim {
    nodes: Vec<MacEngine>,
    index: FxHashMap<MacAddress, usize>,
    medium: Box<dyn Medium>,
    energy: Box<dyn EnergySink>,
    next_exchange: u64,
    next_frame: u64,

    pub metrics: MacMetrics,
    pub inbox: Inbox,
}

impl WifiSim {
    /// Creates a simulation without nodes.
    #[must_use]
    pub fn new(medium: impl Medium + 'static) -> Self {
        Self {
            nodes: Vec::new(),
            index: FxHashMap::default(),
            medium: Box::new(medium),
            energy: Box::new(EnergyLedger::new()),
            next_exchange: 0,
            next_frame: 0,
            metrics: MacMetrics::default(),
            inbox: Inbox::default(),
        }
    }

    /// Replaces the energy sink.
    #[must_use]
    pub fn with_energy_sink(mut self, sink: impl EnergySink + 'static) -> Self {
        self.energy = Box::new(sink);
        self
    }

    /// Adds a MAC configured by `config`.
    ///
    /// # Errors
    ///
    /// Fails for invalid configurations or if the address is already in use.
    pub fn add_node(&mut self, address: MacAddress, config: &MacConfig) -> Result<(), ConfigError> {
        if self.index.contains_key(&address) {
            return Err(ConfigError::new(
                ConfigErrorKind::DuplicateNode,
                format!("node {address} exists twice"),
            ));
        }
        let engine = MacEngine::new(address, config, &NistErrorRateModel)?;
        self.index.insert(address, self.nodes.len());
        self.nodes.push(engine);
        Ok(())
    }

    /// All MACs, in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[MacEngine] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, address: MacAddress) -> Option<&MacEngine> {
        self.index.get(&address).map(|i| &self.nodes[*i])
    }

    #[must_use]
    pub fn contains(&self, address: MacAddress) -> bool {
        self.index.contains_key(&address)
    }

    #[must_use]
    pub fn medium(&self) -> &dyn Medium {
        self.medium.as_ref()
    }

    #[must_use]
    pub fn energy(&self) -> &dyn EnergySink {
        self.energy.as_ref()
    }

    /// # Panics
    ///
    /// Panics for unknown addresses. The medium only reports known nodes.
    pub(crate) fn mac(&self, address: MacAddress) -> &MacEngine {
        match self.index.get(&address) {
            Some(i) => &self.nodes[*i],
            None => panic!("no mac with address {address}"),
        }
    }

    pub(crate) fn mac_mut(&mut self, address: MacAddress) -> &mut MacEngine {
        match self.index.get(&address) {
            Some(i) => &mut self.nodes[*i],
            None => panic!("no mac with address {address}"),
        }
    }

    fn next_exchange_id(&mut self) -> ExchangeId {
        self.next_exchange += 1;
        ExchangeId(self.next_exchange)
    }
}

impl Application for WifiSim {
    type EventSet = WifiEvent;
    type Lifecycle = Self;
}

impl EventLifecycle for WifiSim {
    fn at_sim_end(rt: &mut Runtime<Self>) -> Result<(), RuntimeError> {
        let metrics = &rt.app.metrics;
        info!(
            unicast_sent = metrics.unicast_sent,
            unicast_received = metrics.unicast_received,
            broadcast_sent = metrics.broadcast_sent,
            "simulation ended"
        );
        for node in &rt.app.nodes {
            let queued = node.queue_len() + usize::from(node.current().is_some());
            if queued > 0 {
                trace!("{} ended with {queued} pending frames", node.address());
            }
        }
        Ok(())
    }
}

/// The events of a [`WifiSim`].
#[derive(Debug)]
pub enum WifiEvent {
    Enqueue(Enqueue),
    SetOnline(SetOnline),
    GetSendSlot(GetSendSlot),
    Receive(Receive),
    CarrierSense(CarrierSense),
}

impl EventSet<WifiSim> for WifiEvent {
    fn handle(self, rt: &mut Runtime<WifiSim>) {
        match self {
            Self::Enqueue(event) => event.handle(rt),
            Self::SetOnline(event) => event.handle(rt),
            Self::GetSendSlot(event) => event.handle(rt),
            Self::Receive(event) => event.handle(rt),
            Self::CarrierSense(event) => event.handle(rt),
        }
    }
}

macro_rules! event_variant {
    ($($t:ident),*) => {
        $(
            impl From<$t> for WifiEvent {
                fn from(event: $t) -> Self {
                    Self::$t(event)
                }
            }
        )*
    };
}

event_variant!(Enqueue, SetOnline, GetSendSlot, Receive, CarrierSense);

/// The upper layer of `node` hands a frame to its MAC.
#[derive(Debug)]
pub struct Enqueue {
    pub node: MacAddress,
    pub frame: LinkFrame,
}

impl Event<WifiSim> for Enqueue {
    fn handle(self, rt: &mut Runtime<WifiSim>) {
        logger::scoped(self.node, || exchange::enqueue(rt, self.node, self.frame));
    }
}

/// Connects or disconnects the MAC of `node`.
#[derive(Debug)]
pub struct SetOnline {
    pub node: MacAddress,
    pub online: bool,
}

impl Event<WifiSim> for SetOnline {
    fn handle(self, rt: &mut Runtime<WifiSim>) {
        logger::scoped(self.node, || {
            if self.online {
                info!("going online");
                rt.app.mac_mut(self.node).go_online();
                return;
            }

            info!("going offline");
            let dropped = rt.app.mac_mut(self.node).go_offline();
            for (frame, reason) in dropped {
                exchange::drop_frame(rt, self.node, frame, reason);
            }
        });
    }
}

/// The backoff of `node` is expected to end.
#[derive(Debug)]
pub struct GetSendSlot {
    pub(crate) node: MacAddress,
    pub(crate) epoch: u64,
    pub(crate) exchange: FrameExchange,
}

impl Event<WifiSim> for GetSendSlot {
    fn handle(self, rt: &mut Runtime<WifiSim>) {
        logger::scoped(self.node, || {
            exchange::on_send_slot(rt, self.node, self.epoch, self.exchange);
        });
    }
}

/// A data frame ends at `node`.
#[derive(Debug)]
pub struct Receive {
    pub(crate) node: MacAddress,
    pub(crate) exchange: FrameExchange,
    /// Whether the frame was lost before it reached the receiver.
    pub(crate) dropped: bool,
}

impl Event<WifiSim> for Receive {
    fn handle(self, rt: &mut Runtime<WifiSim>) {
        logger::scoped(self.node, || {
            exchange::on_receive(rt, self.node, self.exchange, self.dropped);
        });
    }
}

/// The signal of `source` reaches its carrier sense neighbors.
#[derive(Debug)]
pub struct CarrierSense {
    pub(crate) source: MacAddress,
    pub(crate) duration: Duration,
}

impl Event<WifiSim> for CarrierSense {
    fn handle(self, rt: &mut Runtime<WifiSim>) {
        exchange::notify_carrier_sense(rt, self.source, self.duration);
    }
}

/// Schedules the upper layer of `source` to send a frame at `time`.
/// Returns the id of the frame.
///
/// # Panics
///
/// Panics if `source` is not part of the simulation.
pub fn schedule_frame(
    rt: &mut Runtime<WifiSim>,
    time: SimTime,
    source: MacAddress,
    destination: Destination,
    payload_size: u32,
) -> u64 {
    assert!(rt.app.contains(source), "no mac with address {source}");
    if let Destination::Unicast(to) = destination {
        if !rt.app.contains(to) {
            warn!("frame from {source} is addressed to unknown node {to}");
        }
    }

    let id = rt.app.next_frame;
    rt.app.next_frame += 1;
    let frame = LinkFrame {
        id,
        source,
        destination,
        payload_size,
    };
    rt.add_event(
        Enqueue {
            node: source,
            frame,
        },
        time,
    );
    id
}
