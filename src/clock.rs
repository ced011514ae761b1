//! Wall-clock arithmetic for broadcast days.
//!
//! A [ClockTime] is a time-of-day within a broadcast day, stored with second precision and
//! displayed as `HH:mm`. The end of the day is representable as the `24:00` sentinel so a
//! program that runs exactly to midnight does not wrap back to `00:00`.
//!
//! All schedule arithmetic lifts a `(date, ClockTime)` pair to a single [NaiveDateTime] first
//! and only projects back onto the split representation at the boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

pub const SECONDS_PER_DAY: u32 = 86_400;
pub const MINUTES_PER_DAY: i64 = 1_440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime(u32);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);
    /// The `24:00` sentinel.
    pub const END_OF_DAY: ClockTime = ClockTime(SECONDS_PER_DAY);

    pub fn from_seconds(seconds: u32) -> Option<Self> {
        (seconds <= SECONDS_PER_DAY).then_some(ClockTime(seconds))
    }

    pub fn hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return None;
        }
        Some(ClockTime(hour * 3600 + minute * 60))
    }

    /// Wraps any minute count onto the 24h dial, so `1440` becomes `00:00`.
    pub fn from_minutes(minutes: i64) -> Self {
        let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
        ClockTime(minutes as u32 * 60)
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    /// Minutes since midnight, truncating any seconds.
    pub fn minutes(self) -> i64 {
        i64::from(self.0 / 60)
    }

    pub fn hour(self) -> u32 {
        self.0 / 3600
    }

    pub fn is_end_of_day(self) -> bool {
        self.0 == SECONDS_PER_DAY
    }

    /// The instant this time-of-day denotes on `date`. `24:00` is the following midnight.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        day_start(date) + TimeDelta::seconds(i64::from(self.0))
    }

    /// Adds a duration and reports how many midnights were crossed.
    ///
    /// Landing exactly on the following midnight yields `24:00` with no rollover, matching how
    /// the rest of the schedule treats the end of a broadcast day.
    pub fn add_seconds(self, date: NaiveDate, seconds: u32) -> (ClockTime, u32) {
        let instant = self.on(date) + TimeDelta::seconds(i64::from(seconds));
        let projected = project(date, instant);
        let rollover = (instant.date() - date).num_days().max(0) as u32;
        if projected.is_end_of_day() {
            (projected, rollover.saturating_sub(1))
        } else {
            (projected, rollover)
        }
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(value: NaiveTime) -> Self {
        ClockTime(value.num_seconds_from_midnight())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 3600, (self.0 % 3600) / 60)
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    /// Accepts `HH:mm` and `HH:mm:ss`, including the `24:00` sentinel.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("invalid time of day {s:?}"));

        let mut parts = s.split(':');
        let mut field = |max: u32| -> Result<Option<u32>, Error> {
            match parts.next() {
                None => Ok(None),
                Some(part) if part.len() == 2 => {
                    let value: u32 = part.parse().map_err(|_| invalid())?;
                    if value > max {
                        return Err(invalid());
                    }
                    Ok(Some(value))
                }
                Some(_) => Err(invalid()),
            }
        };

        let hour = field(24)?.ok_or_else(invalid)?;
        let minute = field(59)?.ok_or_else(invalid)?;
        let second = field(59)?.unwrap_or(0);
        if parts.next().is_some() {
            return Err(invalid());
        }

        let seconds = hour * 3600 + minute * 60 + second;
        ClockTime::from_seconds(seconds).ok_or_else(invalid)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `date` at 00:00:00.000.
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// `date` at 23:59:59.999, the inclusive upper bound used by every overlap test.
pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    next_midnight(date) - TimeDelta::milliseconds(1)
}

/// The start of the day after `date`.
pub fn next_midnight(date: NaiveDate) -> NaiveDateTime {
    day_start(date) + TimeDelta::days(1)
}

/// Projects an instant onto the broadcast day of `date`.
///
/// The following midnight is `24:00`; anything else wraps modulo 24h.
pub fn project(date: NaiveDate, instant: NaiveDateTime) -> ClockTime {
    if instant == next_midnight(date) {
        return ClockTime::END_OF_DAY;
    }
    ClockTime::from(instant.time())
}

/// Whole seconds from `from` to `to`, zero when `to` is not later.
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> u32 {
    let seconds = (to - from).num_seconds();
    u32::try_from(seconds.max(0)).unwrap_or(u32::MAX)
}
