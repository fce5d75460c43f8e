use crate::{
    runtime::{Application, EventId, EventNode},
    time::SimTime,
};
use std::{cmp::Reverse, collections::BinaryHeap};

/// Pending events, popped in (time, insertion) order.
pub(crate) struct FutureEventSet<A>
where
    A: Application,
{
    pending: BinaryHeap<Reverse<EventNode<A>>>,
    clock: SimTime,
}

impl<A> FutureEventSet<A>
where
    A: Application,
{
    pub(crate) fn new(start_time: SimTime) -> Self {
        Self {
            pending: BinaryHeap::with_capacity(64),
            clock: start_time,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// The time of the next event, if any.
    pub(crate) fn peek_time(&self) -> Option<SimTime> {
        self.pending.peek().map(|Reverse(node)| node.time)
    }

    pub(crate) fn pop(&mut self) -> Option<EventNode<A>> {
        let Reverse(node) = self.pending.pop()?;
        self.clock = node.time;
        Some(node)
    }

    /// # Panics
    ///
    /// Panics if `time` lies before the last popped event.
    pub(crate) fn add(&mut self, time: SimTime, id: EventId, event: A::EventSet) {
        assert!(
            time >= self.clock,
            "cannot schedule an event at {time}, the clock is allready at {}",
            self.clock
        );
        self.pending.push(Reverse(EventNode { time, id, event }));
    }
}
