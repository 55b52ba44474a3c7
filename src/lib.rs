//! Pausable timeouts, intervals and countdowns
//!
//! Every engine in this crate runs on a [`TimerQueue`], which stands in for
//! the platform's `setTimeout`/`setInterval` and reads time from a [`Clock`].
//! Use a [`SystemClock`] to run against the wall clock, or a [`ManualClock`]
//! to step virtual time forward in tests.
//!
//! - [`schedule_timeout`] runs a callback once after a delay.
//! - [`schedule_interval`] runs a callback once per period, and can pause and
//!   resume mid-period.
//! - [`schedule_countdown`] reports the time left until a target once per
//!   second.
//!
//! Each engine value owns its timers. Reconfiguring it only rearms when a
//! setting that affects timing changed, swapping its callback never rearms,
//! and dropping it cancels everything it had pending.
//!
//! ```
//! use std::rc::Rc;
//!
//! use chrono::TimeDelta;
//! use metronome::{schedule_interval, IntervalOptions, ManualClock, TimerQueue};
//!
//! let queue = Rc::new(TimerQueue::new(ManualClock::default()));
//! let mut interval = schedule_interval(
//!     &queue,
//!     |timestamp| println!("tick at {}", timestamp),
//!     IntervalOptions {
//!         duration: TimeDelta::milliseconds(100),
//!         ..Default::default()
//!     },
//! );
//!
//! queue.advance_by(TimeDelta::milliseconds(250));
//!
//! interval.reconfigure(IntervalOptions {
//!     duration: TimeDelta::milliseconds(100),
//!     playing: false,
//!     ..Default::default()
//! });
//! ```

mod callback;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod delay;
pub mod hooks;
pub mod interval;
pub mod queue;
pub mod time;
pub mod timeout;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use countdown::{schedule_countdown, Countdown};
pub use delay::{compute_delay, DelayArgs};
pub use interval::{schedule_interval, Interval, IntervalOptions, IntervalState, PauseProgress};
pub use queue::{TimerHandle, TimerQueue};
pub use time::{ms_to_time, TimeBreakdown, TimeDeltaExt};
pub use timeout::{schedule_timeout, Timeout, TimeoutOptions};
