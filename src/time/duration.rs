pub use std::time::Duration;

use super::SimTime;
use std::ops::{Add, AddAssign};

/// Shorthand for a microsecond [`Duration`], the unit of all
/// 802.11 timing parameters.
#[must_use]
pub const fn micros(us: u64) -> Duration {
    Duration::from_micros(us)
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    /// # Panics
    ///
    /// Panics if the result is not representable.
    fn add(self, rhs: Duration) -> SimTime {
        match self.checked_add(rhs) {
            Some(time) => time,
            None => panic!("{self} + {rhs:?} overflows the virtual clock"),
        }
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}
