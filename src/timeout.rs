//! Run a callback once, after a delay

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::TimeDelta;
use log::debug;

use crate::callback::CallbackSlot;
use crate::clock::{Clock, Timestamp};
use crate::queue::{TimerHandle, TimerQueue};

/// Settings for a [`Timeout`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutOptions {
    /// How long to wait before firing
    ///
    /// Negative durations are treated as zero.
    pub duration: TimeDelta,
    /// Whether the timeout is counting down
    pub playing: bool,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            duration: TimeDelta::zero(),
            playing: true,
        }
    }
}

impl TimeoutOptions {
    fn normalized(self) -> Self {
        Self {
            duration: self.duration.max(TimeDelta::zero()),
            ..self
        }
    }
}

struct TimeoutSession {
    options: TimeoutOptions,
    handle: Option<TimerHandle>,
}

/// A callback that runs once, `duration` after it starts playing
///
/// Stopping a timeout throws away its progress: playing it again waits the
/// full duration. Dropping the timeout cancels it.
pub struct Timeout<C: Clock + 'static> {
    queue: Rc<TimerQueue<C>>,
    session: Rc<RefCell<TimeoutSession>>,
    callback: CallbackSlot<Timestamp>,
}

/// Start a [`Timeout`] on the given queue
///
/// The callback receives the time the timeout fired.
pub fn schedule_timeout<C: Clock + 'static>(
    queue: &Rc<TimerQueue<C>>,
    callback: impl FnMut(Timestamp) + 'static,
    options: TimeoutOptions,
) -> Timeout<C> {
    let options = options.normalized();

    let timeout = Timeout {
        queue: queue.clone(),
        session: Rc::new(RefCell::new(TimeoutSession {
            options,
            handle: None,
        })),
        callback: CallbackSlot::new(callback),
    };

    if options.playing {
        timeout.arm();
    }

    timeout
}

impl<C: Clock + 'static> Timeout<C> {
    /// Swap the callback without touching the pending timer
    pub fn set_callback(&mut self, callback: impl FnMut(Timestamp) + 'static) {
        self.callback.replace(callback);
    }

    /// Apply new settings
    ///
    /// The timer is only rearmed when `duration` or `playing` actually change.
    pub fn reconfigure(&mut self, options: TimeoutOptions) {
        let options = options.normalized();
        let previous = self.session.borrow().options;

        if previous == options {
            return;
        }

        self.session.borrow_mut().options = options;
        self.disarm();

        if options.playing {
            self.arm();
        }
    }

    /// Get the current settings
    pub fn options(&self) -> TimeoutOptions {
        self.session.borrow().options
    }

    /// Check if the timeout is waiting to fire
    pub fn is_armed(&self) -> bool {
        self.session.borrow().handle.is_some()
    }

    fn arm(&self) {
        self.disarm();

        let duration = self.session.borrow().options.duration;
        let queue: Weak<TimerQueue<C>> = Rc::downgrade(&self.queue);
        let session = Rc::downgrade(&self.session);
        let callback = self.callback.clone();

        let handle = self.queue.set_timeout(duration, move || {
            let (Some(queue), Some(session)) = (queue.upgrade(), session.upgrade()) else {
                return;
            };

            session.borrow_mut().handle = None;
            callback.invoke(queue.now());
        });

        debug!("Armed timeout for {}ms", duration.num_milliseconds());

        self.session.borrow_mut().handle = Some(handle);
    }

    fn disarm(&self) {
        let handle = self.session.borrow_mut().handle.take();

        if let Some(handle) = handle {
            self.queue.clear(handle);
            debug!("Disarmed timeout");
        }
    }
}

impl<C: Clock + 'static> Drop for Timeout<C> {
    fn drop(&mut self) {
        self.disarm();
    }
}
