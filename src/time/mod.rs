//! Converting and formatting spans of time

#[doc(hidden)]
pub mod duration;

use std::fmt;

use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const HRS_PER_DAY: i64 = 24;

pub const MINS_PER_HR: i64 = 60;
pub const MINS_PER_DAY: i64 = MINS_PER_HR * HRS_PER_DAY;

pub const SECS_PER_MIN: i64 = 60;
pub const SECS_PER_HR: i64 = SECS_PER_MIN * MINS_PER_HR;
pub const SECS_PER_DAY: i64 = SECS_PER_HR * HRS_PER_DAY;

pub const MS_PER_SEC: i64 = 1000;
pub const MS_PER_MIN: i64 = MS_PER_SEC * SECS_PER_MIN;
pub const MS_PER_HR: i64 = MS_PER_MIN * MINS_PER_HR;
pub const MS_PER_DAY: i64 = MS_PER_HR * HRS_PER_DAY;

/// A span of time split into whole days, hours, minutes and seconds
///
/// Every field carries the sign of the span it came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeBreakdown {
    /// Check if any field is below zero
    pub fn is_negative(&self) -> bool {
        self.days < 0 || self.hours < 0 || self.minutes < 0 || self.seconds < 0
    }
}

/// Formats as `hh:mm:ss`, with a leading day count when there is one
impl fmt::Display for TimeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }

        if self.days != 0 {
            write!(f, "{}d ", self.days.abs())?;
        }

        let pad = PadOptions::default();

        write!(
            f,
            "{}:{}:{}",
            left_pad_number(self.hours.abs(), &pad),
            left_pad_number(self.minutes.abs(), &pad),
            left_pad_number(self.seconds.abs(), &pad),
        )
    }
}

/// Split a span of time into days, hours, minutes and seconds
///
/// Each field is rounded toward zero, so a negative span produces the mirror
/// image of the equivalent positive span.
pub fn ms_to_time(delta: TimeDelta) -> TimeBreakdown {
    let seconds = delta.num_milliseconds() / MS_PER_SEC;
    let minutes = seconds / SECS_PER_MIN;
    let hours = minutes / MINS_PER_HR;

    TimeBreakdown {
        days: hours / HRS_PER_DAY,
        hours: hours % HRS_PER_DAY,
        minutes: minutes % MINS_PER_HR,
        seconds: seconds % SECS_PER_MIN,
    }
}

/// Negate a number, leaving zero alone
pub fn flip_number_sign(value: i64) -> i64 {
    if value == 0 {
        value
    } else {
        -value
    }
}

/// Negate every field of a breakdown
pub fn flip_time_sign(time: TimeBreakdown) -> TimeBreakdown {
    TimeBreakdown {
        days: flip_number_sign(time.days),
        hours: flip_number_sign(time.hours),
        minutes: flip_number_sign(time.minutes),
        seconds: flip_number_sign(time.seconds),
    }
}

/// How [`left_pad_number`] pads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PadOptions<'a> {
    /// Minimum width of the output, in characters
    pub padding: usize,
    /// Filler repeated in front of the number until it is wide enough
    pub prefix: &'a str,
}

impl Default for PadOptions<'_> {
    fn default() -> Self {
        Self {
            padding: 2,
            prefix: "0",
        }
    }
}

/// Format a number with filler in front of it, e.g. `9` as `"09"`
pub fn left_pad_number(value: i64, options: &PadOptions) -> String {
    let digits = value.to_string();
    let width = digits.chars().count();

    if width >= options.padding || options.prefix.is_empty() {
        return digits;
    }

    let mut padded: String = options
        .prefix
        .chars()
        .cycle()
        .take(options.padding - width)
        .collect();
    padded.push_str(&digits);

    padded
}

/// Extensions to `TimeDelta`
pub trait TimeDeltaExt
where
    Self: Sized,
{
    /// Parse a `TimeDelta` from a humanized string, for example "1h30m" or "500ms".
    ///
    /// A bare number is read as seconds.
    fn from_human(s: &str) -> Result<Self>;

    /// Formats the TimeDelta as a "kitchen timer" string, e.g. mm:ss.
    ///
    /// If the delta is longer than an hour, the delta is formatted as hh:mm:ss.
    fn to_kitchen(&self) -> String;

    /// Formats the TimeDelta in a humanized way, for example 22m30s.
    fn to_human(&self) -> String;
}

impl TimeDeltaExt for TimeDelta {
    fn from_human(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Ok(seconds) = s.parse::<i64>() {
            return TimeDelta::try_seconds(seconds)
                .with_context(|| format!("{} seconds is out of range", seconds));
        }

        let whole = Regex::new(r"^(?:[0-9]+(?:ms|h|m|s))+$")
            .with_context(|| "Failed to compile duration regex")?;
        let part = Regex::new(r"([0-9]+)(ms|h|m|s)")
            .with_context(|| "Failed to compile duration regex")?;

        if !whole.is_match(s) {
            bail!("\"{}\" is not a duration, try something like 25m or 1h30m", s);
        }

        let mut total = TimeDelta::zero();

        for cap in part.captures_iter(s) {
            let amount: i64 = cap[1]
                .parse()
                .with_context(|| format!("{} is not an integer", &cap[1]))?;

            let delta = match &cap[2] {
                "h" => TimeDelta::try_hours(amount),
                "m" => TimeDelta::try_minutes(amount),
                "s" => TimeDelta::try_seconds(amount),
                _ => TimeDelta::try_milliseconds(amount),
            }
            .with_context(|| format!("Duration \"{}\" is out of range", s))?;

            total = total
                .checked_add(&delta)
                .with_context(|| format!("Duration \"{}\" is out of range", s))?;
        }

        Ok(total)
    }

    fn to_kitchen(&self) -> String {
        let sign = if *self < TimeDelta::zero() { "-" } else { "" };
        let delta = self.abs();

        let hours = delta.num_hours();
        let minutes = delta.num_minutes() - (hours * MINS_PER_HR);
        let seconds = delta.num_seconds() - (delta.num_minutes() * SECS_PER_MIN);

        if hours > 0 {
            format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
        } else {
            format!("{}{:02}:{:02}", sign, minutes, seconds)
        }
    }

    fn to_human(&self) -> String {
        use std::fmt::Write;

        if self.is_zero() {
            return "0s".to_string();
        }

        let mut acc = String::new();

        if *self < TimeDelta::zero() {
            acc.push('-');
        }

        let delta = self.abs();
        let hours = delta.num_hours();
        let minutes = delta.num_minutes() - (hours * MINS_PER_HR);
        let seconds = delta.num_seconds() - (delta.num_minutes() * SECS_PER_MIN);

        if delta < TimeDelta::seconds(1) {
            let _ = write!(acc, "{}ms", delta.num_milliseconds());
            return acc;
        }

        if hours > 0 {
            let _ = write!(acc, "{}h", hours);
        }

        if minutes > 0 {
            let _ = write!(acc, "{}m", minutes);
        }

        if seconds > 0 {
            let _ = write!(acc, "{}s", seconds);
        }

        acc
    }
}
