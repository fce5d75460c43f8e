use tracing::debug;

use crate::{
    mac::{DropReason, LinkFrame, MacAddress},
    time::SimTime,
};

/// A frame handed to the upper layer of `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub node: MacAddress,
    pub frame: LinkFrame,
    pub time: SimTime,
}

/// A frame the MAC of `node` gave up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropNotice {
    pub node: MacAddress,
    pub frame: LinkFrame,
    pub reason: DropReason,
    pub time: SimTime,
}

/// The upper layer surface of all MACs: what was delivered, and what
/// was dropped.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    deliveries: Vec<Delivery>,
    drops: Vec<DropNotice>,
}

impl Inbox {
    pub(crate) fn deliver(&mut self, node: MacAddress, frame: LinkFrame) {
        debug!("delivered {frame}");
        self.deliveries.push(Delivery {
            node,
            frame,
            time: SimTime::now(),
        });
    }

    pub(crate) fn drop_frame(&mut self, node: MacAddress, frame: LinkFrame, reason: DropReason) {
        debug!("dropped {frame}: {reason}");
        self.drops.push(DropNotice {
            node,
            frame,
            reason,
            time: SimTime::now(),
        });
    }

    #[must_use]
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// The frames delivered to `node`.
    pub fn delivered_to(&self, node: MacAddress) -> impl Iterator<Item = &Delivery> + '_ {
        self.deliveries.iter().filter(move |d| d.node == node)
    }

    #[must_use]
    pub fn drops(&self) -> &[DropNotice] {
        &self.drops
    }

    /// The drop notifications of `node`.
    pub fn drops_at(&self, node: MacAddress) -> impl Iterator<Item = &DropNotice> + '_ {
        self.drops.iter().filter(move |d| d.node == node)
    }
}
