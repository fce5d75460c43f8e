//!
//! Virtual time of a simulation run.
//!
//! All MAC timing in this crate is expressed in whole microseconds, so
//! comparisons like "the backoff ends exactly now" are exact.
//!
//! ```rust
//! # use des_wifi::time::*;
//! let difs = Duration::from_micros(34);
//! let t = SimTime::from_micros(100) + difs;
//! assert_eq!(t.as_micros(), 134);
//! ```

mod duration;
pub use duration::*;

use serde::{de::Visitor, Deserialize, Serialize};
use std::{
    fmt::{Debug, Display},
    ops::Sub,
    sync::atomic::{AtomicU64, Ordering},
};

/// Nanoseconds since the start of the simulation. Only the runtime
/// advances this clock.
static NOW_NANOS: AtomicU64 = AtomicU64::new(0);

/// A point in virtual time, measured from the start of the simulation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// The current virtual time.
    #[must_use]
    pub fn now() -> Self {
        SimTime(Duration::from_nanos(NOW_NANOS.load(Ordering::SeqCst)))
    }

    pub(crate) fn set_now(time: SimTime) {
        // saturates after ~584 years of virtual time
        let nanos = u64::try_from(time.0.as_nanos()).unwrap_or(u64::MAX);
        NOW_NANOS.store(nanos, Ordering::SeqCst);
    }

    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(Duration::from_micros(micros))
    }

    /// # Panics
    ///
    /// Panics for negative or non-finite values.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs))
    }

    #[must_use]
    pub const fn as_micros(&self) -> u128 {
        self.0.as_micros()
    }

    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// The time elapsed since `earlier`.
    ///
    /// # Panics
    ///
    /// Panics if `earlier` lies after `self`.
    #[must_use]
    pub fn duration_since(&self, earlier: SimTime) -> Duration {
        match self.checked_duration_since(earlier) {
            Some(d) => d,
            None => panic!("{earlier} lies after {self}"),
        }
    }

    #[must_use]
    pub fn checked_duration_since(&self, earlier: SimTime) -> Option<Duration> {
        self.0.checked_sub(earlier.0)
    }

    /// The time elapsed since `earlier`, or zero if `earlier` lies after `self`.
    #[must_use]
    pub fn saturating_duration_since(&self, earlier: SimTime) -> Duration {
        self.checked_duration_since(earlier).unwrap_or_default()
    }

    #[must_use]
    pub fn checked_add(&self, duration: Duration) -> Option<SimTime> {
        self.0.checked_add(duration).map(SimTime)
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Points in time are written as seconds.
impl Serialize for SimTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.as_secs_f64())
    }
}

impl<'de> Deserialize<'de> for SimTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(SecondsVisitor)
    }
}

struct SecondsVisitor;

impl Visitor<'_> for SecondsVisitor {
    type Value = SimTime;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a non-negative number of seconds")
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<SimTime, E> {
        Duration::try_from_secs_f64(v)
            .map(SimTime)
            .map_err(|_| E::custom(format!("invalid point in time: {v}")))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<SimTime, E> {
        Ok(SimTime(Duration::from_secs(v)))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<SimTime, E> {
        u64::try_from(v)
            .map(|v| SimTime(Duration::from_secs(v)))
            .map_err(|_| E::custom(format!("invalid point in time: {v}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microsecond_arithmetic() {
        let t = SimTime::from_micros(50);
        assert_eq!((t + micros(34)).as_micros(), 84);
        assert_eq!(t - SimTime::from_micros(16), micros(34));
        assert_eq!(
            SimTime::from_micros(10).saturating_duration_since(t),
            Duration::ZERO
        );

        let mut time = SimTime::from_secs_f64(0.25);
        time += micros(250_000);
        assert_eq!(time, SimTime::from_micros(500_000));
        assert_eq!(time.to_string(), "500ms");
    }

    #[test]
    #[should_panic(expected = "lies after")]
    fn negative_durations_panic() {
        let _ = SimTime::from_micros(1) - SimTime::from_micros(2);
    }

    #[test]
    fn deserialize_seconds() {
        let t: SimTime = serde_yml::from_str("0.5").unwrap();
        assert_eq!(t, SimTime::from_micros(500_000));
        let t: SimTime = serde_yml::from_str("3").unwrap();
        assert_eq!(t, SimTime::from_micros(3_000_000));
        assert!(serde_yml::from_str::<SimTime>("-1.0").is_err());
    }
}
