//! Single-threaded timer primitives
//!
//! [`TimerQueue`] plays the part of the platform's `setTimeout`,
//! `setInterval` and `clearTimeout`. Pending timers are ordered by due time,
//! and timers due at the same instant fire in the order they were armed.
//!
//! Nothing fires on its own. A queue is driven by one of:
//!
//! - [`TimerQueue::run_due`], which fires everything due right now,
//! - [`TimerQueue::advance_by`] on a [`ManualClock`], which moves virtual time
//!   forward and fires timers along the way,
//! - [`TimerQueue::run_while`] on a [`SystemClock`], which sleeps until the
//!   next deadline.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use chrono::TimeDelta;
use log::trace;

use crate::clock::{offset, Clock, ManualClock, SystemClock, Timestamp};

/// Shortest period a repeating timer will run at
pub fn min_interval_period() -> TimeDelta {
    TimeDelta::milliseconds(1)
}

/// Opaque identifier of an armed timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

type Task = Box<dyn FnMut()>;

struct ScheduledTimer {
    due: Timestamp,
    seq: u64,
    period: Option<TimeDelta>,
    task: Option<Task>,
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    next_seq: u64,
    deadlines: BTreeMap<(Timestamp, u64), TimerHandle>,
    timers: HashMap<TimerHandle, ScheduledTimer>,
}

impl QueueState {
    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Pending single-shot and repeating timers, read against a [`Clock`]
pub struct TimerQueue<C: Clock = SystemClock> {
    clock: C,
    state: RefCell<QueueState>,
}

impl<C: Clock> TimerQueue<C> {
    /// Create an empty queue
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: RefCell::new(QueueState::default()),
        }
    }

    /// Get the clock this queue reads time from
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Get the current time according to this queue's clock
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Arm a timer that runs `task` once, `delay` from now
    ///
    /// Negative delays are treated as zero. A deadline past the last
    /// representable timestamp is pinned there and never comes due.
    pub fn set_timeout(&self, delay: TimeDelta, task: impl FnMut() + 'static) -> TimerHandle {
        let delay = delay.max(TimeDelta::zero());
        self.insert(delay, None, Box::new(task))
    }

    /// Arm a timer that runs `task` every `period`, starting one period from now
    ///
    /// Periods shorter than [`min_interval_period`] are raised to it.
    pub fn set_interval(&self, period: TimeDelta, task: impl FnMut() + 'static) -> TimerHandle {
        let period = period.max(min_interval_period());
        self.insert(period, Some(period), Box::new(task))
    }

    fn insert(&self, delay: TimeDelta, period: Option<TimeDelta>, task: Task) -> TimerHandle {
        let due = offset(self.now(), delay);

        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let handle = TimerHandle(state.next_id);
        let seq = state.bump_seq();

        state.deadlines.insert((due, seq), handle);
        state.timers.insert(
            handle,
            ScheduledTimer {
                due,
                seq,
                period,
                task: Some(task),
            },
        );

        trace!("Armed timer {:?} due at {}", handle, due);

        handle
    }

    /// Cancel a timer
    ///
    /// Returns `false` if the handle was already cancelled or has fired.
    pub fn clear(&self, handle: TimerHandle) -> bool {
        let mut state = self.state.borrow_mut();

        match state.timers.remove(&handle) {
            Some(timer) => {
                state.deadlines.remove(&(timer.due, timer.seq));
                trace!("Cleared timer {:?}", handle);
                true
            }
            None => false,
        }
    }

    /// Check if a timer is still waiting to fire
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.state.borrow().timers.contains_key(&handle)
    }

    /// Get the number of armed timers
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Get the time the next timer is due, if any
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.state
            .borrow()
            .deadlines
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }

    /// Fire every timer that is due at the current time
    ///
    /// Returns how many tasks ran.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let mut fired = 0;

        while self.fire_next(now) {
            fired += 1;
        }

        fired
    }

    /// Fire the earliest timer if it is due at or before `limit`
    ///
    /// No borrow of the queue is held while the task runs, so tasks are free
    /// to arm and clear timers, including their own.
    fn fire_next(&self, limit: Timestamp) -> bool {
        let (handle, mut task) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;

            let Some((&(due, seq), &handle)) = state.deadlines.first_key_value() else {
                return false;
            };

            if due > limit {
                return false;
            }

            state.deadlines.remove(&(due, seq));

            let periodic = state.timers.get(&handle).and_then(|timer| timer.period);

            let task = match periodic {
                Some(period) => {
                    let next_seq = state.bump_seq();
                    let next_due = offset(due, period);

                    state.deadlines.insert((next_due, next_seq), handle);

                    state.timers.get_mut(&handle).and_then(|timer| {
                        timer.due = next_due;
                        timer.seq = next_seq;
                        timer.task.take()
                    })
                }
                None => state.timers.remove(&handle).and_then(|timer| timer.task),
            };

            (handle, task)
        };

        trace!("Firing timer {:?}", handle);

        if let Some(task) = task.as_mut() {
            task();
        }

        if let Some(task) = task {
            if let Some(timer) = self.state.borrow_mut().timers.get_mut(&handle) {
                if timer.task.is_none() {
                    timer.task = Some(task);
                }
            }
        }

        true
    }
}

impl TimerQueue<ManualClock> {
    /// Move virtual time forward by `delta`, firing timers as their deadlines pass
    ///
    /// Returns how many tasks ran.
    pub fn advance_by(&self, delta: TimeDelta) -> usize {
        let target = offset(self.now(), delta);
        self.advance_to(target)
    }

    /// Move virtual time forward to `target`, firing timers as their deadlines pass
    pub fn advance_to(&self, target: Timestamp) -> usize {
        let mut fired = 0;

        while let Some(due) = self.next_deadline() {
            if due > target {
                break;
            }

            if due > self.now() {
                self.clock.set(due);
            }

            if self.fire_next(due) {
                fired += 1;
            }
        }

        if target > self.now() {
            self.clock.set(target);
        }

        fired
    }
}

impl TimerQueue<SystemClock> {
    /// Fire timers in real time until `keep_going` returns `false` or nothing is left to fire
    pub fn run_while(&self, mut keep_going: impl FnMut() -> bool) {
        while keep_going() {
            self.run_due();

            if !keep_going() {
                break;
            }

            let Some(deadline) = self.next_deadline() else {
                break;
            };

            if let Ok(wait) = (deadline - self.now()).to_std() {
                std::thread::sleep(wait);
            }
        }
    }
}
