use crate::time::SimTime;
use std::fmt::{self, Display};

/// When a [`Runtime`](super::Runtime) stops dispatching, even though
/// events are still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLimit {
    /// Runs until the future event set is empty.
    None,
    /// Stops after this many dispatched events.
    EventCount(usize),
    /// Stops before the first event after this point. Events at exactly
    /// this point still run.
    SimTime(SimTime),
    /// Stops once both limits are reached.
    CombinedAnd(Box<RuntimeLimit>, Box<RuntimeLimit>),
    /// Stops once either limit is reached.
    CombinedOr(Box<RuntimeLimit>, Box<RuntimeLimit>),
}

impl RuntimeLimit {
    /// Whether dispatching event number `nth` at `time` would cross the limit.
    pub(crate) fn applies(&self, nth: usize, time: SimTime) -> bool {
        match self {
            RuntimeLimit::None => false,
            RuntimeLimit::EventCount(max) => nth > *max,
            RuntimeLimit::SimTime(end) => time > *end,
            RuntimeLimit::CombinedAnd(a, b) => a.applies(nth, time) && b.applies(nth, time),
            RuntimeLimit::CombinedOr(a, b) => a.applies(nth, time) || b.applies(nth, time),
        }
    }

    /// Tightens the limit, so that either the old or the new one ends the run.
    pub(crate) fn add(&mut self, limit: RuntimeLimit) {
        let current = std::mem::replace(self, RuntimeLimit::None);
        *self = match current {
            RuntimeLimit::None => limit,
            current => RuntimeLimit::CombinedOr(Box::new(current), Box::new(limit)),
        };
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeLimit::None => f.write_str("unlimited"),
            RuntimeLimit::EventCount(max) => write!(f, "{max} events"),
            RuntimeLimit::SimTime(end) => write!(f, "until {end}"),
            RuntimeLimit::CombinedAnd(a, b) => write!(f, "({a} and {b})"),
            RuntimeLimit::CombinedOr(a, b) => write!(f, "({a} or {b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_limit_is_inclusive() {
        let limit = RuntimeLimit::SimTime(SimTime::from_micros(1_000));
        assert_eq!(limit.to_string(), "until 1ms");
        assert!(!limit.applies(0, SimTime::from_micros(999)));
        assert!(!limit.applies(0, SimTime::from_micros(1_000)));
        assert!(limit.applies(0, SimTime::from_micros(1_001)));
    }

    #[test]
    fn added_limits_combine_with_or() {
        let mut limit = RuntimeLimit::None;
        assert_eq!(limit.to_string(), "unlimited");
        limit.add(RuntimeLimit::EventCount(10));
        assert_eq!(limit, RuntimeLimit::EventCount(10));

        limit.add(RuntimeLimit::SimTime(SimTime::from_micros(50)));
        assert_eq!(limit.to_string(), "(10 events or until 50µs)");
        assert!(limit.applies(11, SimTime::ZERO));
        assert!(limit.applies(1, SimTime::from_micros(51)));
        assert!(!limit.applies(10, SimTime::from_micros(50)));

        let both = RuntimeLimit::CombinedAnd(
            Box::new(RuntimeLimit::EventCount(10)),
            Box::new(RuntimeLimit::SimTime(SimTime::from_micros(50))),
        );
        assert!(!both.applies(11, SimTime::ZERO));
        assert!(both.applies(11, SimTime::from_micros(51)));
    }
}
