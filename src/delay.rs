//! How long an interval waits before its next tick

use chrono::TimeDelta;

/// Everything [`compute_delay`] looks at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayArgs {
    /// Length of one period
    pub duration: TimeDelta,
    /// Resume from where the last pause left off
    pub allow_pausing: bool,
    /// Time left in the period as of the last pause
    pub time_remaining: TimeDelta,
    /// Fire the first tick right away instead of after one period
    pub skip_first_interval: bool,
    /// Whether the session has fired its first tick yet
    pub first_interval_played: bool,
}

/// Get the delay before the next tick should fire
///
/// Skipping the first interval wins over pausing, but only until the first
/// tick has played.
pub fn compute_delay(args: &DelayArgs) -> TimeDelta {
    if args.skip_first_interval && !args.first_interval_played {
        return TimeDelta::zero();
    }

    if args.allow_pausing {
        args.time_remaining
    } else {
        args.duration
    }
}
