//!
//! The discrete event runtime driving a simulation.
//!
//! The MAC layer never touches the future event set directly. Instead
//! the [`WifiSim`](crate::sim::WifiSim) application schedules its own
//! event set through [`Runtime::add_event`] and reads the clock via
//! [`SimTime::now`].
//!

use crate::time::{Duration, SimTime};
use rand::{distr::StandardUniform, prelude::Distribution, rngs::StdRng, Rng};
use std::{
    any::type_name,
    fmt::Debug,
    sync::{Mutex, MutexGuard},
    time::Instant,
};
use tracing::info;

mod event;
pub use self::event::*;

mod limit;
pub use self::limit::*;

mod builder;
pub use builder::*;

mod error;
pub use error::*;

/// The RNG of the active runtime. All randomness of a run is drawn from
/// here, so that equal seeds reproduce equal runs.
pub(crate) static RNG: Mutex<Option<StdRng>> = Mutex::new(None);

/// Runs `f` with exclusive access to the runtime RNG.
///
/// # Panics
///
/// Panics if no runtime was built yet.
pub fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    let mut lock = RNG.lock().unwrap_or_else(|p| p.into_inner());
    match lock.as_mut() {
        Some(rng) => f(rng),
        None => panic!("runtime RNG is not initialized, build a runtime first"),
    }
}

/// Draws a value from the standard distribution of `T`.
#[must_use]
pub fn random<T>() -> T
where
    StandardUniform: Distribution<T>,
{
    with_rng(|rng| rng.random::<T>())
}

/// Wall clock statistics of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profiler {
    started: Option<Instant>,
    /// The wall clock duration of the run.
    pub duration: Duration,
    /// The number of dispatched events.
    pub event_count: usize,
}

/// Executes the events of an [`Application`] in time order.
///
/// Build a runtime with a [`Builder`], schedule the initial events with
/// [`Runtime::add_event`] and [`run`](Runtime::run) it.
pub struct Runtime<App>
where
    App: Application,
{
    /// The application, holding all simulation state.
    pub app: App,

    running: bool,
    limit: RuntimeLimit,
    quiet: bool,

    next_event_id: EventId,
    dispatched: usize,
    profiler: Profiler,

    future_event_set: FutureEventSet<App>,

    #[allow(dead_code)]
    permit: MutexGuard<'static, ()>,
}

impl<A> Runtime<A>
where
    A: Application,
{
    /// Runs the application until no events are left or the limit applies.
    ///
    /// # Errors
    ///
    /// Returns the error raised by [`EventLifecycle::at_sim_end`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime was allready started.
    pub fn run(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        self.start();
        self.dispatch_all();
        self.finish()
    }

    /// Starts a run, for callers that dispatch manually.
    ///
    /// # Panics
    ///
    /// Panics if the runtime was allready started.
    pub fn start(&mut self) {
        assert!(!self.running, "runtime was allready started");
        if !self.quiet {
            info!(
                app = type_name::<A>(),
                limit = %self.limit,
                events = self.future_event_set.len(),
                "simulation starting"
            );
        }

        self.profiler.started = Some(Instant::now());
        A::Lifecycle::at_sim_start(self);
        self.running = true;
    }

    /// Dispatches events until none are left or the limit applies.
    ///
    /// # Panics
    ///
    /// Panics if the runtime was not started.
    pub fn dispatch_all(&mut self) {
        assert!(self.running, "dispatching requires a started runtime");
        while self.dispatch_next() {}
    }

    /// Ends a run and returns the application, the final time and the profile.
    ///
    /// # Errors
    ///
    /// Returns the error raised by [`EventLifecycle::at_sim_end`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime was not started.
    pub fn finish(mut self) -> Result<(A, SimTime, Profiler), RuntimeError> {
        assert!(self.running, "only a started runtime can be finished");

        A::Lifecycle::at_sim_end(&mut self)?;
        self.profiler.event_count = self.dispatched;
        self.profiler.duration = self
            .profiler
            .started
            .map(|t| t.elapsed())
            .unwrap_or_default();

        let time = SimTime::now();
        if !self.quiet {
            info!(
                events = self.dispatched,
                pending = self.future_event_set.len(),
                "simulation ended at {time}"
            );
        }
        Ok((self.app, time, self.profiler))
    }

    /// Dispatches the next event. Returns `false` if the run is over.
    fn dispatch_next(&mut self) -> bool {
        let Some(time) = self.future_event_set.peek_time() else {
            return false;
        };
        if self.limit.applies(self.dispatched + 1, time) {
            return false;
        }
        let Some(node) = self.future_event_set.pop() else {
            return false;
        };

        self.dispatched += 1;
        // the only place where the clock advances
        SimTime::set_now(node.time);
        node.event.handle(self);
        true
    }

    /// Schedules `event` at `time`. Events of the same instant are
    /// dispatched in the order they were added.
    ///
    /// # Panics
    ///
    /// Panics if `time` lies in the past.
    pub fn add_event(&mut self, event: impl Into<A::EventSet>, time: SimTime) {
        self.future_event_set
            .add(time, self.next_event_id, event.into());
        self.next_event_id += 1;
    }
}

impl<A> Debug for Runtime<A>
where
    A: Application,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("app", &type_name::<A>())
            .field("now", &SimTime::now())
            .field("limit", &self.limit)
            .field("dispatched", &self.dispatched)
            .field("pending", &self.future_event_set.len())
            .finish_non_exhaustive()
    }
}
