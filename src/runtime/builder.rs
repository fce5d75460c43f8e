use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Mutex, TryLockError};
use tracing::{error, warn};

use super::{Application, FutureEventSet, Profiler, Runtime, RuntimeLimit, RNG};
use crate::time::SimTime;

/// Held by the one runtime that may exist at a time. The clock and the
/// RNG are process wide.
static SIMULATION_LOCK: Mutex<()> = Mutex::new(());

/// Configures and creates a [`Runtime`].
#[must_use]
#[derive(Debug)]
pub struct Builder {
    seed: u64,
    quiet: bool,
    limit: RuntimeLimit,
    start_time: SimTime,
}

impl Builder {
    /// A builder whose runtime draws all randomness from `seed`.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            seed,
            quiet: false,
            limit: RuntimeLimit::None,
            start_time: SimTime::ZERO,
        }
    }

    /// Suppresses the start and end messages of the runtime.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    /// Stops the run after `max_itr` events.
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    /// Stops the run before the first event after `max_time`.
    pub fn max_time(mut self, max_time: SimTime) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time));
        self
    }

    /// Creates the runtime, resetting the clock and reseeding the RNG.
    ///
    /// Blocks while another runtime is alive.
    pub fn build<A: Application>(self, app: A) -> Runtime<A> {
        let permit = match SIMULATION_LOCK.try_lock() {
            Ok(permit) => permit,
            Err(TryLockError::WouldBlock) => {
                warn!("another runtime is alive, waiting for the simulation lock");
                SIMULATION_LOCK.lock().unwrap_or_else(|p| {
                    error!("a previous runtime panicked, recovering the simulation lock");
                    p.into_inner()
                })
            }
            Err(TryLockError::Poisoned(p)) => {
                error!("a previous runtime panicked, recovering the simulation lock");
                p.into_inner()
            }
        };

        SimTime::set_now(self.start_time);
        *RNG.lock().unwrap_or_else(|p| p.into_inner()) = Some(StdRng::seed_from_u64(self.seed));

        Runtime {
            app,
            running: false,
            limit: self.limit,
            quiet: self.quiet,
            next_event_id: 0,
            dispatched: 0,
            profiler: Profiler::default(),
            future_event_set: FutureEventSet::new(self.start_time),
            permit,
        }
    }
}
