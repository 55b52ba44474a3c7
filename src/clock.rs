//! Sources of the current time

use std::cell::Cell;

use chrono::{DateTime, TimeDelta, Utc};

/// A point in time, as read from a [`Clock`]
pub type Timestamp = DateTime<Utc>;

/// Offset a timestamp, saturating at the ends of the representable range
///
/// A deadline past the last representable instant is simply never reached.
pub fn offset(time: Timestamp, delta: TimeDelta) -> Timestamp {
    time.checked_add_signed(delta).unwrap_or(if delta < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Something that can tell the current time
///
/// Every engine reads time through a clock so that tests can run against
/// virtual time instead of waiting for the wall clock.
pub trait Clock {
    /// Get the current time
    fn now(&self) -> Timestamp;
}

/// The real wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    current: Cell<Timestamp>,
}

impl ManualClock {
    /// Create a clock stopped at the given time
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    /// Jump to the given time
    ///
    /// Jumping backwards is allowed, which is how clock adjustments are simulated.
    pub fn set(&self, time: Timestamp) {
        self.current.set(time);
    }

    /// Move the clock forward
    pub fn advance(&self, delta: TimeDelta) {
        self.current.set(offset(self.current.get(), delta));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.current.get()
    }
}
