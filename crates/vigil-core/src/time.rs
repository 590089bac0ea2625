// vigil-core/src/time.rs
// ============================================================================
// Module: Vigil Clock
// Description: Deterministic time source abstraction.
// Purpose: Let state-machine, approval-gate, and harness timers be replayed
//          under test without depending on the wall clock.
// Dependencies: chrono
// ============================================================================

//! ## Overview
//! Every module that stamps a timestamp or measures a duration takes a
//! `&dyn Clock` (or a generic `C: Clock`) rather than calling `Utc::now()`
//! directly. Production code wires up [`SystemClock`]; tests wire up
//! [`FixedClock`] or [`SteppingClock`] for fully deterministic runs.

use std::sync::Mutex;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

/// A point in time, always expressed in UTC.
pub type Timestamp = DateTime<Utc>;

/// Abstract source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    /// Creates a clock fixed at the given instant.
    #[must_use]
    pub const fn new(instant: Timestamp) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Clock that advances by a fixed step every time it is read.
///
/// Useful for asserting ordering invariants (e.g. `_state_timestamps` are
/// monotonically non-decreasing) without sleeping in tests.
#[derive(Debug)]
pub struct SteppingClock {
    current: Mutex<Timestamp>,
    step: Duration,
}

impl SteppingClock {
    /// Creates a stepping clock starting at `start`, advancing by `step` on
    /// every call to [`Clock::now`].
    #[must_use]
    pub const fn new(start: Timestamp, step: Duration) -> Self {
        Self { current: Mutex::new(start), step }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let mut guard = self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let value = *guard;
        *guard = value + self.step;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_clock_advances_monotonically() {
        let clock = SteppingClock::new(Utc::now(), Duration::seconds(1));
        let first = clock.now();
        let second = clock.now();
        assert!(second > first);
    }

    #[test]
    fn fixed_clock_never_moves() {
        let instant = Utc::now();
        let clock = FixedClock::new(instant);
        assert_eq!(clock.now(), clock.now());
    }
}
