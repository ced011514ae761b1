//! Live/past/future classification of programs against an explicit `now`.
//!
//! Classification is by the program's tagged `date` and its `HH:mm` bounds only. A program
//! is never live on any day but its own, and one whose end time is earlier than its start
//! time (it crosses midnight) is never classified as live.

use chrono::{NaiveDateTime, Timelike};

use crate::clock;
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Past,
    Live,
    Future,
}

impl Liveness {
    pub fn of(program: &Program, now: NaiveDateTime) -> Self {
        if is_live(program, now) {
            Liveness::Live
        } else if is_past(program, now) {
            Liveness::Past
        } else {
            Liveness::Future
        }
    }

    /// Past and live programs are fixed points that rescheduling must not move.
    pub fn is_fixed(self) -> bool {
        !matches!(self, Liveness::Future)
    }
}

fn minutes_of_day(now: NaiveDateTime) -> i64 {
    i64::from(now.time().num_seconds_from_midnight() / 60)
}

pub fn is_live(program: &Program, now: NaiveDateTime) -> bool {
    if program.date != now.date() {
        return false;
    }

    let now = minutes_of_day(now);
    program.start_time.minutes() <= now && now < program.end_time.minutes()
}

pub fn is_past(program: &Program, now: NaiveDateTime) -> bool {
    program.date == now.date() && minutes_of_day(now) >= program.end_time.minutes()
}

pub fn is_future(program: &Program, now: NaiveDateTime) -> bool {
    !is_live(program, now) && !is_past(program, now)
}

/// Percentage of the program already played at `now`, clamped to `0..=100`.
///
/// Unlike classification this uses real instants, so a program crossing midnight still
/// progresses.
pub fn progress(program: &Program, now: NaiveDateTime) -> f64 {
    let starts_at = program.starts_at();
    let total = clock::seconds_between(starts_at, program.ends_at());
    if total == 0 {
        return 100.0;
    }

    let elapsed = (now - starts_at).num_seconds() as f64;
    (elapsed / f64::from(total) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod test {
    use crate::program::fixture::{at, date, program};

    use super::*;

    #[test]
    pub fn test_live_boundaries() {
        let p = program(1, date("2024-01-15"), "10:00", 3600);

        assert!(is_live(&p, at("2024-01-15", "10:00:00")));
        assert!(is_live(&p, at("2024-01-15", "10:59:59")));
        assert!(!is_live(&p, at("2024-01-15", "11:00:00")));
        assert!(!is_live(&p, at("2024-01-15", "09:59:59")));
        assert!(!is_live(&p, at("2024-01-16", "10:30:00")));
    }

    #[test]
    pub fn test_past_and_future() {
        let p = program(1, date("2024-01-15"), "10:00", 3600);

        assert_eq!(Liveness::of(&p, at("2024-01-15", "09:00:00")), Liveness::Future);
        assert_eq!(Liveness::of(&p, at("2024-01-15", "10:30:00")), Liveness::Live);
        assert_eq!(Liveness::of(&p, at("2024-01-15", "11:00:00")), Liveness::Past);

        // Only the tagged day counts, in either direction.
        assert!(is_future(&p, at("2024-01-16", "12:00:00")));
        assert!(is_future(&p, at("2024-01-14", "12:00:00")));
    }

    #[test]
    pub fn test_midnight_crossing_is_never_live() {
        let p = program(1, date("2024-01-15"), "23:50", 1200);
        assert!(!is_live(&p, at("2024-01-15", "23:55:00")));
    }

    #[test]
    pub fn test_end_of_day_sentinel_is_live_until_midnight() {
        let p = program(1, date("2024-01-15"), "23:00", 3600);
        assert!(is_live(&p, at("2024-01-15", "23:59:59")));
        assert!(!is_past(&p, at("2024-01-15", "23:59:59")));
    }

    #[test]
    pub fn test_progress() {
        let p = program(1, date("2024-01-15"), "10:00", 3600);
        assert_eq!(progress(&p, at("2024-01-15", "09:00:00")), 0.0);
        assert_eq!(progress(&p, at("2024-01-15", "10:30:00")), 50.0);
        assert_eq!(progress(&p, at("2024-01-15", "12:00:00")), 100.0);

        let crossing = program(2, date("2024-01-15"), "23:50", 1200);
        assert_eq!(progress(&crossing, at("2024-01-16", "00:00:00")), 50.0);
    }
}
