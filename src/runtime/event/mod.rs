use crate::runtime::{Runtime, RuntimeError};
use crate::time::SimTime;
use std::{cmp::Ordering, fmt};

mod event_set;
pub(crate) use event_set::*;

/// The state of a simulation, driven by a [`Runtime`].
pub trait Application: Sized {
    /// All events the application can schedule, usually an enum.
    type EventSet: EventSet<Self>;
    /// Hooks called when a run starts and ends. Use `()` for none.
    type Lifecycle: EventLifecycle<Self>;
}

/// Dispatches an event of the application's event set, typically by
/// matching on the variant and calling [`Event::handle`].
pub trait EventSet<App>
where
    App: Application<EventSet = Self>,
{
    fn handle(self, rt: &mut Runtime<App>);
}

/// A single kind of event.
pub trait Event<App>
where
    App: Application,
{
    /// Applies the event at the current virtual time.
    fn handle(self, rt: &mut Runtime<App>);
}

/// Hooks around a run of an application.
pub trait EventLifecycle<A = Self> {
    /// Called once, before the first event. Initial events may be
    /// scheduled here.
    #[allow(unused_variables)]
    fn at_sim_start(runtime: &mut Runtime<A>)
    where
        A: Application,
    {
    }

    /// Called once, after the last dispatched event.
    ///
    /// # Errors
    ///
    /// An error marks the whole run as failed and is returned by
    /// [`Runtime::run`].
    #[allow(unused_variables)]
    fn at_sim_end(runtime: &mut Runtime<A>) -> Result<(), RuntimeError>
    where
        A: Application,
    {
        Ok(())
    }
}

impl<A> EventLifecycle<A> for () {}

/// Insertion counter of the runtime, breaking ties between equal times.
pub(crate) type EventId = usize;

/// A scheduled event. Orders by time, then by insertion.
pub(crate) struct EventNode<A>
where
    A: Application,
{
    pub(crate) time: SimTime,
    pub(crate) id: EventId,
    pub(crate) event: A::EventSet,
}

impl<A: Application> EventNode<A> {
    fn key(&self) -> (SimTime, EventId) {
        (self.time, self.id)
    }
}

impl<A: Application> PartialEq for EventNode<A> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<A: Application> Eq for EventNode<A> {}

impl<A: Application> PartialOrd for EventNode<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A: Application> Ord for EventNode<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl<A: Application> fmt::Debug for EventNode<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNode")
            .field("time", &self.time)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
