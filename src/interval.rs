//! Run a callback repeatedly, with pause and resume
//!
//! An [`Interval`] waits one period, fires, and then keeps firing once per
//! period until it is paused or dropped. The first wait is computed by
//! [`compute_delay`], which is where `allow_pausing` and
//! `skip_first_interval` come into play:
//!
//! - Without `allow_pausing`, resuming after a pause always waits a full
//!   period. Progress made before the pause is thrown away.
//! - With `allow_pausing`, resuming waits only for what was left of the
//!   period when it was paused.
//! - With `skip_first_interval`, the very first tick fires without waiting.
//!   After that first tick the option has no further effect.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::TimeDelta;
use log::debug;

use crate::callback::CallbackSlot;
use crate::clock::{offset, Clock, Timestamp};
use crate::delay::{compute_delay, DelayArgs};
use crate::queue::{TimerHandle, TimerQueue};

/// Settings for an [`Interval`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalOptions {
    /// Length of one period
    ///
    /// Negative durations are treated as zero.
    pub duration: TimeDelta,
    /// Whether the interval is running
    pub playing: bool,
    /// Resume from where a pause left off instead of restarting the period
    pub allow_pausing: bool,
    /// Fire the first tick immediately
    pub skip_first_interval: bool,
}

impl Default for IntervalOptions {
    fn default() -> Self {
        Self {
            duration: TimeDelta::zero(),
            playing: true,
            allow_pausing: false,
            skip_first_interval: false,
        }
    }
}

impl IntervalOptions {
    fn normalized(self) -> Self {
        Self {
            duration: self.duration.max(TimeDelta::zero()),
            ..self
        }
    }
}

/// How far into its period an interval was when it was paused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PauseProgress {
    /// Percentage of the period that had elapsed, rounded down
    pub progress: u8,
    /// Time left in the period
    pub time_remaining: TimeDelta,
}

/// What an [`Interval`] is doing right now
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalState {
    /// Has never run
    Idle,
    /// Waiting for the next tick
    Armed,
    /// Stopped after having run
    Paused,
}

struct IntervalSession {
    options: IntervalOptions,
    first_interval_played: bool,
    /// Start of the current period
    start_time: Option<Timestamp>,
    time_remaining: TimeDelta,
    timeout: Option<TimerHandle>,
    interval: Option<TimerHandle>,
}

/// A callback that runs once per period while playing
///
/// Dropping the interval cancels every timer it holds.
pub struct Interval<C: Clock + 'static> {
    queue: Rc<TimerQueue<C>>,
    session: Rc<RefCell<IntervalSession>>,
    callback: CallbackSlot<Timestamp>,
    on_pause: CallbackSlot<PauseProgress>,
}

/// Start an [`Interval`] on the given queue
///
/// The callback receives the time of each tick.
pub fn schedule_interval<C: Clock + 'static>(
    queue: &Rc<TimerQueue<C>>,
    callback: impl FnMut(Timestamp) + 'static,
    options: IntervalOptions,
) -> Interval<C> {
    let options = options.normalized();

    let interval = Interval {
        queue: queue.clone(),
        session: Rc::new(RefCell::new(IntervalSession {
            options,
            first_interval_played: false,
            start_time: None,
            time_remaining: options.duration,
            timeout: None,
            interval: None,
        })),
        callback: CallbackSlot::new(callback),
        on_pause: CallbackSlot::empty(),
    };

    if options.playing {
        interval.arm();
    }

    interval
}

impl<C: Clock + 'static> Interval<C> {
    /// Be told how far along the period was whenever the interval is paused
    ///
    /// Nothing is reported while a `skip_first_interval` tick is still
    /// pending, since no period has started yet.
    pub fn on_pause(&mut self, handler: impl FnMut(PauseProgress) + 'static) {
        self.on_pause.replace(handler);
    }

    /// Swap the callback without touching any pending timer
    pub fn set_callback(&mut self, callback: impl FnMut(Timestamp) + 'static) {
        self.callback.replace(callback);
    }

    /// Apply new settings
    ///
    /// Changing `duration`, `playing` or `allow_pausing` disarms and rearms.
    /// Changing only `skip_first_interval` is stored without rearming.
    pub fn reconfigure(&mut self, options: IntervalOptions) {
        let options = options.normalized();

        let previous = {
            let mut session = self.session.borrow_mut();
            let previous = session.options;

            session.options = options;

            if options.duration != previous.duration {
                session.time_remaining = options.duration;
            }

            previous
        };

        let rearm = options.duration != previous.duration
            || options.playing != previous.playing
            || options.allow_pausing != previous.allow_pausing;

        if !rearm {
            return;
        }

        self.disarm();

        if options.playing {
            self.arm();
        } else if previous.playing {
            self.pause();
        }
    }

    /// Get the current settings
    pub fn options(&self) -> IntervalOptions {
        self.session.borrow().options
    }

    /// Get what the interval is doing
    pub fn state(&self) -> IntervalState {
        let session = self.session.borrow();

        if session.timeout.is_some() || session.interval.is_some() {
            IntervalState::Armed
        } else if session.start_time.is_some() {
            IntervalState::Paused
        } else {
            IntervalState::Idle
        }
    }

    /// Get the time left in the period as of the last pause
    pub fn time_remaining(&self) -> TimeDelta {
        self.session.borrow().time_remaining
    }

    /// Check if the first tick has fired
    pub fn first_interval_played(&self) -> bool {
        self.session.borrow().first_interval_played
    }

    fn arm(&self) {
        self.disarm();

        let now = self.queue.now();

        let delay = {
            let mut session = self.session.borrow_mut();

            let delay = compute_delay(&DelayArgs {
                duration: session.options.duration,
                allow_pausing: session.options.allow_pausing,
                time_remaining: session.time_remaining,
                skip_first_interval: session.options.skip_first_interval,
                first_interval_played: session.first_interval_played,
            });

            // Backdate the period start so that a pause measures progress
            // through the whole period, not just since this arm.
            session.start_time = Some(offset(now, delay - session.options.duration));

            delay
        };

        let queue = Rc::downgrade(&self.queue);
        let session = Rc::downgrade(&self.session);
        let callback = self.callback.clone();

        let handle = self.queue.set_timeout(delay, move || {
            let (Some(queue), Some(session)) = (queue.upgrade(), session.upgrade()) else {
                return;
            };

            let now = queue.now();

            let duration = {
                let mut session = session.borrow_mut();

                session.timeout = None;
                session.time_remaining = session.options.duration;
                session.start_time = Some(now);
                session.first_interval_played = true;

                session.options.duration
            };

            let repeat = queue.set_interval(
                duration,
                repeating_task(Rc::downgrade(&queue), Rc::downgrade(&session), callback.clone()),
            );
            session.borrow_mut().interval = Some(repeat);

            callback.invoke(now);
        });

        debug!("Armed interval, first tick in {}ms", delay.num_milliseconds());

        self.session.borrow_mut().timeout = Some(handle);
    }

    fn disarm(&self) {
        let (timeout, interval) = {
            let mut session = self.session.borrow_mut();
            (session.timeout.take(), session.interval.take())
        };

        if let Some(handle) = timeout {
            self.queue.clear(handle);
        }

        if let Some(handle) = interval {
            self.queue.clear(handle);
        }

        if timeout.is_some() || interval.is_some() {
            debug!("Disarmed interval");
        }
    }

    /// Record how far through the period the interval got
    fn pause(&self) {
        let now = self.queue.now();

        let progress = {
            let mut session = self.session.borrow_mut();
            let duration = session.options.duration;

            let Some(start_time) = session.start_time else {
                return;
            };

            if duration.num_milliseconds() <= 0 {
                return;
            }

            // A skipped first interval is owed at once, so no period has begun.
            if session.options.skip_first_interval && !session.first_interval_played {
                return;
            }

            let elapsed = (now - start_time).clamp(TimeDelta::zero(), duration);
            session.time_remaining = duration - elapsed;

            let percent = i128::from(elapsed.num_milliseconds()) * 100
                / i128::from(duration.num_milliseconds());

            PauseProgress {
                progress: percent.clamp(0, 100) as u8,
                time_remaining: session.time_remaining,
            }
        };

        debug!(
            "Paused interval at {}% with {}ms remaining",
            progress.progress,
            progress.time_remaining.num_milliseconds()
        );

        if self.on_pause.is_set() {
            self.on_pause.invoke(progress);
        }
    }
}

fn repeating_task<C: Clock + 'static>(
    queue: Weak<TimerQueue<C>>,
    session: Weak<RefCell<IntervalSession>>,
    callback: CallbackSlot<Timestamp>,
) -> impl FnMut() + 'static {
    move || {
        let (Some(queue), Some(session)) = (queue.upgrade(), session.upgrade()) else {
            return;
        };

        let now = queue.now();

        {
            let mut session = session.borrow_mut();
            session.time_remaining = session.options.duration;
            session.start_time = Some(now);
        }

        callback.invoke(now);
    }
}

impl<C: Clock + 'static> Drop for Interval<C> {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::TimeDelta;

    use super::{schedule_interval, IntervalOptions, IntervalState, PauseProgress};
    use crate::clock::{ManualClock, Timestamp};
    use crate::queue::TimerQueue;

    fn ms(n: i64) -> TimeDelta {
        TimeDelta::milliseconds(n)
    }

    type Calls = Rc<RefCell<Vec<Timestamp>>>;

    fn setup() -> (Rc<TimerQueue<ManualClock>>, Calls) {
        (
            Rc::new(TimerQueue::new(ManualClock::default())),
            Rc::new(RefCell::new(Vec::new())),
        )
    }

    fn record(calls: &Calls) -> impl FnMut(Timestamp) + 'static {
        let calls = calls.clone();
        move |timestamp| calls.borrow_mut().push(timestamp)
    }

    fn every(duration: i64) -> IntervalOptions {
        IntervalOptions {
            duration: ms(duration),
            ..Default::default()
        }
    }

    #[test]
    fn does_not_fire_before_first_period() {
        let (queue, calls) = setup();

        let _interval = schedule_interval(&queue, record(&calls), every(100));

        queue.advance_by(ms(99));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn fires_after_first_period_with_tick_time() {
        let (queue, calls) = setup();
        let start = queue.now();

        let _interval = schedule_interval(&queue, record(&calls), every(100));

        queue.advance_by(ms(100));
        assert_eq!(*calls.borrow(), vec![start + ms(100)]);
    }

    #[test]
    fn fires_once_per_period() {
        let (queue, calls) = setup();
        let start = queue.now();

        let _interval = schedule_interval(&queue, record(&calls), every(100));

        queue.advance_by(ms(300));

        assert_eq!(
            *calls.borrow(),
            vec![start + ms(100), start + ms(200), start + ms(300)]
        );
    }

    #[test]
    fn zero_duration_fires_right_away() {
        let (queue, calls) = setup();

        let _interval = schedule_interval(&queue, record(&calls), IntervalOptions::default());

        assert!(calls.borrow().is_empty());
        queue.advance_by(ms(0));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn does_not_fire_when_not_playing() {
        let (queue, calls) = setup();

        let interval = schedule_interval(
            &queue,
            record(&calls),
            IntervalOptions {
                playing: false,
                ..every(100)
            },
        );

        queue.advance_by(ms(200));

        assert!(calls.borrow().is_empty());
        assert_eq!(interval.state(), IntervalState::Idle);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn pausing_before_expiry_prevents_firing() {
        let (queue, calls) = setup();
        let options = every(100);

        let mut interval = schedule_interval(&queue, record(&calls), options);

        queue.advance_by(ms(50));
        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });
        queue.advance_by(ms(100));

        assert!(calls.borrow().is_empty());
        assert_eq!(interval.state(), IntervalState::Paused);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn resume_without_allow_pausing_restarts_period() {
        let (queue, calls) = setup();
        let options = every(100);

        let mut interval = schedule_interval(&queue, record(&calls), options);

        queue.advance_by(ms(99));
        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });
        queue.advance_by(ms(1000));
        assert!(calls.borrow().is_empty());

        interval.reconfigure(options);
        queue.advance_by(ms(99));
        assert!(calls.borrow().is_empty());

        queue.advance_by(ms(1));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn resume_with_allow_pausing_honors_remainder() {
        let (queue, calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let options = IntervalOptions {
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, record(&calls), options);
        let seen = pauses.clone();
        interval.on_pause(move |progress| seen.borrow_mut().push(progress));

        queue.advance_by(ms(90));
        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });

        assert_eq!(
            *pauses.borrow(),
            vec![PauseProgress {
                progress: 90,
                time_remaining: ms(10),
            }]
        );

        queue.advance_by(ms(5000));
        assert!(calls.borrow().is_empty());

        interval.reconfigure(options);
        queue.advance_by(ms(9));
        assert!(calls.borrow().is_empty());

        queue.advance_by(ms(1));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn pause_notice_without_allow_pausing() {
        let (queue, calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let options = every(100);

        let mut interval = schedule_interval(&queue, record(&calls), options);
        let seen = pauses.clone();
        interval.on_pause(move |progress| seen.borrow_mut().push(progress));

        queue.advance_by(ms(40));
        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });

        assert_eq!(
            *pauses.borrow(),
            vec![PauseProgress {
                progress: 40,
                time_remaining: ms(60),
            }]
        );

        let resumed_at = queue.now();
        interval.reconfigure(options);

        queue.advance_by(ms(60));
        assert!(calls.borrow().is_empty());

        queue.advance_by(ms(40));
        assert_eq!(*calls.borrow(), vec![resumed_at + ms(100)]);
    }

    #[test]
    fn no_pause_notice_before_skipped_first_tick() {
        let (queue, calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let options = IntervalOptions {
            skip_first_interval: true,
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, record(&calls), options);
        let seen = pauses.clone();
        interval.on_pause(move |progress| seen.borrow_mut().push(progress));

        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });
        queue.advance_by(ms(500));

        assert!(pauses.borrow().is_empty());
        assert!(calls.borrow().is_empty());

        interval.reconfigure(options);
        queue.advance_by(ms(0));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn far_future_period_does_not_overflow() {
        let (queue, calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let options = IntervalOptions {
            duration: TimeDelta::MAX,
            allow_pausing: true,
            ..Default::default()
        };

        let mut interval = schedule_interval(&queue, record(&calls), options);
        let seen = pauses.clone();
        interval.on_pause(move |progress| seen.borrow_mut().push(progress));

        queue.advance_by(TimeDelta::days(365));
        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });

        assert!(calls.borrow().is_empty());
        assert_eq!(pauses.borrow().len(), 1);
        assert_eq!(pauses.borrow()[0].progress, 0);
    }

    #[test]
    fn pause_mid_cadence_resumes_from_remainder() {
        let (queue, calls) = setup();
        let options = IntervalOptions {
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, record(&calls), options);

        queue.advance_by(ms(230));
        assert_eq!(calls.borrow().len(), 2);

        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });
        assert_eq!(interval.time_remaining(), ms(70));

        queue.advance_by(ms(770));
        let resumed_at = queue.now();
        interval.reconfigure(options);

        queue.advance_by(ms(170));

        assert_eq!(
            calls.borrow()[2..],
            [resumed_at + ms(70), resumed_at + ms(170)]
        );
    }

    #[test]
    fn second_pause_measures_whole_period() {
        let (queue, _calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let options = IntervalOptions {
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, |_| {}, options);
        let seen = pauses.clone();
        interval.on_pause(move |progress: PauseProgress| seen.borrow_mut().push(progress.progress));

        let paused = IntervalOptions {
            playing: false,
            ..options
        };

        queue.advance_by(ms(30));
        interval.reconfigure(paused);
        queue.advance_by(ms(500));
        interval.reconfigure(options);
        queue.advance_by(ms(30));
        interval.reconfigure(paused);

        assert_eq!(*pauses.borrow(), vec![30, 60]);
        assert_eq!(interval.time_remaining(), ms(40));
    }

    #[test]
    fn skip_first_interval_fires_immediately_then_on_cadence() {
        let (queue, calls) = setup();
        let start = queue.now();

        let interval = schedule_interval(
            &queue,
            record(&calls),
            IntervalOptions {
                skip_first_interval: true,
                ..every(100)
            },
        );

        assert!(calls.borrow().is_empty());

        queue.advance_by(ms(1));
        assert_eq!(calls.borrow().len(), 1);
        assert!(interval.first_interval_played());

        queue.advance_by(ms(98));
        assert_eq!(calls.borrow().len(), 1);

        queue.advance_by(ms(1));
        assert_eq!(calls.borrow().len(), 2);

        queue.advance_by(ms(100));
        assert_eq!(
            *calls.borrow(),
            vec![start, start + ms(100), start + ms(200)]
        );
    }

    #[test]
    fn skip_first_interval_only_applies_once() {
        let (queue, calls) = setup();
        let options = IntervalOptions {
            skip_first_interval: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, record(&calls), options);

        queue.advance_by(ms(50));
        assert_eq!(calls.borrow().len(), 1);

        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });
        interval.reconfigure(options);

        queue.advance_by(ms(99));
        assert_eq!(calls.borrow().len(), 1);

        queue.advance_by(ms(1));
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn callback_swap_keeps_cadence() {
        let (queue, calls) = setup();
        let swapped = Rc::new(RefCell::new(Vec::new()));
        let start = queue.now();

        let mut interval = schedule_interval(&queue, record(&calls), every(100));

        queue.advance_by(ms(150));
        let deadline = queue.next_deadline();

        interval.set_callback(record(&swapped));

        assert_eq!(queue.next_deadline(), deadline);
        assert_eq!(queue.pending(), 1);

        queue.advance_by(ms(50));

        assert_eq!(*calls.borrow(), vec![start + ms(100)]);
        assert_eq!(*swapped.borrow(), vec![start + ms(200)]);
    }

    #[test]
    fn skip_first_interval_change_does_not_rearm() {
        let (queue, _calls) = setup();
        let options = every(100);

        let mut interval = schedule_interval(&queue, |_| {}, options);

        queue.advance_by(ms(40));
        let deadline = queue.next_deadline();

        interval.reconfigure(IntervalOptions {
            skip_first_interval: true,
            ..options
        });

        assert_eq!(queue.next_deadline(), deadline);
    }

    #[test]
    fn duration_change_rearms_on_new_period() {
        let (queue, calls) = setup();
        let start = queue.now();

        let mut interval = schedule_interval(&queue, record(&calls), every(100));

        queue.advance_by(ms(150));
        interval.reconfigure(every(30));
        assert_eq!(interval.time_remaining(), ms(30));

        queue.advance_by(ms(60));

        assert_eq!(
            *calls.borrow(),
            vec![start + ms(100), start + ms(180), start + ms(210)]
        );
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn no_pause_notice_for_session_that_never_ran() {
        let (queue, _calls) = setup();
        let pauses = Rc::new(RefCell::new(0));
        let options = IntervalOptions {
            playing: false,
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, |_| {}, options);
        let seen = pauses.clone();
        interval.on_pause(move |_| *seen.borrow_mut() += 1);

        queue.advance_by(ms(50));
        interval.reconfigure(IntervalOptions {
            allow_pausing: false,
            ..options
        });
        interval.reconfigure(IntervalOptions {
            duration: ms(200),
            ..options
        });

        assert_eq!(*pauses.borrow(), 0);
        assert_eq!(interval.state(), IntervalState::Idle);
    }

    #[test]
    fn clock_jumping_backwards_clamps_progress() {
        let (queue, _calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let options = IntervalOptions {
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, |_| {}, options);
        let seen = pauses.clone();
        interval.on_pause(move |progress| seen.borrow_mut().push(progress));

        queue.advance_by(ms(50));
        queue.clock().advance(ms(-1000));

        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });

        assert_eq!(
            *pauses.borrow(),
            vec![PauseProgress {
                progress: 0,
                time_remaining: ms(100),
            }]
        );
    }

    #[test]
    fn pause_and_resume_scenario() {
        let (queue, calls) = setup();
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let start = queue.now();
        let options = IntervalOptions {
            allow_pausing: true,
            ..every(100)
        };

        let mut interval = schedule_interval(&queue, record(&calls), options);
        let seen = pauses.clone();
        interval.on_pause(move |progress| seen.borrow_mut().push(progress));

        queue.advance_by(ms(20));
        interval.reconfigure(IntervalOptions {
            playing: false,
            ..options
        });

        assert_eq!(
            *pauses.borrow(),
            vec![PauseProgress {
                progress: 20,
                time_remaining: ms(80),
            }]
        );

        queue.advance_to(start + ms(500));
        interval.reconfigure(options);

        queue.advance_to(start + ms(579));
        assert!(calls.borrow().is_empty());

        queue.advance_to(start + ms(580));
        assert_eq!(*calls.borrow(), vec![start + ms(580)]);
    }

    #[test]
    fn drop_releases_timers() {
        let (queue, calls) = setup();

        let interval = schedule_interval(&queue, record(&calls), every(100));

        queue.advance_by(ms(150));
        assert_eq!(calls.borrow().len(), 1);

        drop(interval);
        assert_eq!(queue.pending(), 0);

        queue.advance_by(ms(1000));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn drop_before_first_tick_releases_timers() {
        let (queue, calls) = setup();

        let interval = schedule_interval(
            &queue,
            record(&calls),
            IntervalOptions {
                skip_first_interval: true,
                ..every(100)
            },
        );

        drop(interval);
        queue.advance_by(ms(1000));

        assert!(calls.borrow().is_empty());
        assert_eq!(queue.pending(), 0);
    }
}
