//! Report the time left until a target, once per second

use std::cell::Cell;
use std::rc::Rc;

use chrono::TimeDelta;
use log::debug;

use crate::callback::CallbackSlot;
use crate::clock::{Clock, Timestamp};
use crate::interval::{schedule_interval, Interval, IntervalOptions, IntervalState};
use crate::queue::TimerQueue;
use crate::time::MS_PER_SEC;

/// How often a countdown reports
pub fn countdown_period() -> TimeDelta {
    TimeDelta::milliseconds(MS_PER_SEC)
}

fn interval_options(pause: bool) -> IntervalOptions {
    IntervalOptions {
        duration: countdown_period(),
        playing: !pause,
        allow_pausing: true,
        skip_first_interval: false,
    }
}

/// Calls back with `target - now` every second
///
/// The difference goes negative once the target has passed, so the same
/// engine counts up from a past instant. Reports also happen immediately
/// whenever the countdown starts, resumes, or gets a new target, so callers
/// never see a value more than a second stale.
pub struct Countdown<C: Clock + 'static> {
    queue: Rc<TimerQueue<C>>,
    target: Rc<Cell<Timestamp>>,
    paused: bool,
    callback: CallbackSlot<TimeDelta>,
    interval: Interval<C>,
}

/// Start a [`Countdown`] toward `time_target`
pub fn schedule_countdown<C: Clock + 'static>(
    queue: &Rc<TimerQueue<C>>,
    callback: impl FnMut(TimeDelta) + 'static,
    time_target: Timestamp,
    pause: bool,
) -> Countdown<C> {
    let callback = CallbackSlot::new(callback);
    let target = Rc::new(Cell::new(time_target));

    let tick_callback = callback.clone();
    let tick_target = target.clone();

    let interval = schedule_interval(
        queue,
        move |timestamp| tick_callback.invoke(tick_target.get() - timestamp),
        interval_options(pause),
    );

    let countdown = Countdown {
        queue: queue.clone(),
        target,
        paused: pause,
        callback,
        interval,
    };

    if !pause {
        countdown.report();
    }

    countdown
}

impl<C: Clock + 'static> Countdown<C> {
    /// Swap the callback without touching the one-second cadence
    pub fn set_callback(&mut self, callback: impl FnMut(TimeDelta) + 'static) {
        self.callback.replace(callback);
    }

    /// Count toward a different instant
    ///
    /// The new difference is reported right away if running. The one-second
    /// cadence keeps its existing offset.
    pub fn set_target(&mut self, time_target: Timestamp) {
        if self.target.get() == time_target {
            return;
        }

        debug!("Countdown target moved to {}", time_target);

        self.target.set(time_target);

        if !self.paused {
            self.report();
        }
    }

    /// Pause or resume reporting
    ///
    /// Resuming reports right away, then continues ticking from where the
    /// pause left off.
    pub fn set_paused(&mut self, pause: bool) {
        if self.paused == pause {
            return;
        }

        self.paused = pause;
        self.interval.reconfigure(interval_options(pause));

        if !pause {
            self.report();
        }
    }

    /// Get the instant being counted toward
    pub fn target(&self) -> Timestamp {
        self.target.get()
    }

    /// Check if reporting is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Get the state of the underlying one-second interval
    pub fn state(&self) -> IntervalState {
        self.interval.state()
    }

    fn report(&self) {
        self.callback.invoke(self.target.get() - self.queue.now());
    }
}
