use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::clock::{self, ClockTime};
use crate::error::{Error, Result};
use crate::program::Program;
use crate::schedule::tail_anchor;

/// Where a newly appended program lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub date: NaiveDate,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    /// The program runs past the end of its broadcast day. It must not be persisted without
    /// the operator's confirmation.
    pub overflow: bool,
}

/// Places a program of `duration` seconds directly after the last program of `date`.
///
/// The day ends at [clock::day_end], so a program ending exactly at the following midnight
/// already overflows. Fails with [Error::DayFull] when the day's tail is past the end of the
/// day.
pub fn append(day_programs: &[Program], duration: u32, date: NaiveDate) -> Result<Placement> {
    let starts_at = tail_anchor(day_programs, date);
    let day_end = clock::day_end(date);
    if starts_at > day_end {
        return Err(Error::DayFull(date));
    }

    let ends_at = starts_at + TimeDelta::seconds(i64::from(duration));

    Ok(Placement {
        date,
        starts_at,
        ends_at,
        start_time: clock::project(date, starts_at),
        end_time: clock::project(date, ends_at),
        overflow: ends_at > day_end,
    })
}

#[cfg(test)]
mod test {
    use crate::program::fixture::{at, date, program};

    use super::*;

    #[test]
    pub fn test_empty_day_starts_at_midnight() {
        let d = date("2024-01-15");
        let placement = append(&[], 1800, d).unwrap();
        assert_eq!(placement.start_time.to_string(), "00:00");
        assert_eq!(placement.end_time.to_string(), "00:30");
        assert_eq!(placement.starts_at, at("2024-01-15", "00:00:00"));
        assert!(!placement.overflow);
    }

    #[test]
    pub fn test_follows_last_program() {
        let d = date("2024-01-15");
        let day = vec![program(1, d, "08:00", 1800)];

        let placement = append(&day, 600, d).unwrap();
        assert_eq!(placement.start_time.to_string(), "08:30");
        assert_eq!(placement.end_time.to_string(), "08:40");
        assert_eq!(placement.start_time, day[0].end_time);
    }

    #[test]
    pub fn test_anchor_is_last_by_start_not_by_position() {
        let d = date("2024-01-15");
        let day = vec![program(2, d, "12:00", 600), program(1, d, "08:00", 1800)];
        assert_eq!(append(&day, 60, d).unwrap().start_time.to_string(), "12:10");
    }

    #[test]
    pub fn test_other_days_are_ignored() {
        let d = date("2024-01-15");
        let day = vec![program(1, date("2024-01-14"), "22:00", 3600)];
        assert_eq!(append(&day, 60, d).unwrap().start_time.to_string(), "00:00");
    }

    #[test]
    pub fn test_overflow_is_flagged() {
        let d = date("2024-01-15");
        let day = vec![program(1, d, "23:30", 1200)];

        let placement = append(&day, 1200, d).unwrap();
        assert!(placement.overflow);
        assert_eq!(placement.start_time.to_string(), "23:50");
        assert_eq!(placement.end_time.to_string(), "00:10");
        assert_eq!(placement.ends_at, at("2024-01-16", "00:10:00"));

        // Ending on the following midnight is past 23:59:59.999 and needs confirmation too.
        let exact = append(&day, 600, d).unwrap();
        assert!(exact.overflow);
        assert_eq!(exact.ends_at, at("2024-01-16", "00:00:00"));
        assert_eq!(exact.end_time, ClockTime::END_OF_DAY);

        let last_second = append(&day, 599, d).unwrap();
        assert!(!last_second.overflow);
        assert_eq!(last_second.ends_at, at("2024-01-15", "23:59:59"));
    }

    #[test]
    pub fn test_full_day_is_rejected() {
        let d = date("2024-01-15");
        let full = vec![program(1, d, "00:00", 86_400)];
        assert!(matches!(append(&full, 60, d), Err(Error::DayFull(day)) if day == d));

        let spilled = vec![program(1, d, "23:00", 7200)];
        assert!(matches!(append(&spilled, 60, d), Err(Error::DayFull(_))));

        // A program of a whole day or more keeps its real end when projected.
        let long = vec![program(1, d, "00:00", 36_000), program(2, d, "10:00", 86_400)];
        assert!(matches!(append(&long, 600, d), Err(Error::DayFull(_))));
    }
}
