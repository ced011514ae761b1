//! Daisy-chaining a reordered day back into a contiguous schedule.
//!
//! Past and live programs are fixed points: their times never change and each one's end
//! seeds the start of the next future program. Future programs are packed back to back in
//! the order given, starting at midnight when no fixed point precedes them. Running past the
//! end of the day is allowed here; only appends ask for confirmation.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::clock;
use crate::liveness::Liveness;
use crate::program::{Program, ProgramId, TimeRange};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflow {
    /// Every input program, in input order, with future programs retimed.
    pub updated: Vec<Program>,
    /// The future programs whose start or end actually moved.
    pub changed: Vec<Program>,
    /// New absolute bounds for each changed program, for a single bulk rewrite.
    pub rewrites: Vec<TimeRange>,
}

impl Reflow {
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Recomputes the times of `date`'s programs in the order given.
///
/// Programs tagged with another date pass through untouched and do not anchor anything. The
/// caller is responsible for not moving a fixed program away from its recorded position.
pub fn reflow(ordered: &[Program], now: NaiveDateTime, date: NaiveDate) -> Reflow {
    let mut anchor: Option<NaiveDateTime> = None;
    let mut result = Reflow::default();

    for program in ordered {
        if program.date != date {
            result.updated.push(program.clone());
            continue;
        }

        if Liveness::of(program, now).is_fixed() {
            anchor = Some(program.ends_at());
            result.updated.push(program.clone());
            continue;
        }

        let starts_at = *anchor.get_or_insert_with(|| clock::day_start(date));
        let ends_at = starts_at + TimeDelta::seconds(i64::from(program.duration));
        anchor = Some(ends_at);

        let mut retimed = program.clone();
        retimed.start_time = clock::project(date, starts_at);
        retimed.end_time = clock::project(date, ends_at);

        if retimed.start_time != program.start_time || retimed.end_time != program.end_time {
            debug!(
                id = program.id,
                from = %program.start_time,
                to = %retimed.start_time,
                "program moved"
            );
            result.changed.push(retimed.clone());
            result.rewrites.push(TimeRange {
                id: program.id,
                starts_at,
                ends_at,
            });
        }
        result.updated.push(retimed);
    }

    result
}

/// Lays `(id, duration)` pairs back to back starting at `anchor`.
pub fn chain<I>(anchor: NaiveDateTime, programs: I) -> Vec<TimeRange>
where
    I: IntoIterator<Item = (ProgramId, u32)>,
{
    let mut starts_at = anchor;
    programs
        .into_iter()
        .map(|(id, duration)| {
            let ends_at = starts_at + TimeDelta::seconds(i64::from(duration));
            let range = TimeRange {
                id,
                starts_at,
                ends_at,
            };
            starts_at = ends_at;
            range
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::liveness::is_future;
    use crate::program::fixture::{at, date, program};

    use super::*;

    fn times(programs: &[Program]) -> Vec<(ProgramId, String, String)> {
        programs
            .iter()
            .map(|p| (p.id, p.start_time.to_string(), p.end_time.to_string()))
            .collect()
    }

    #[test]
    pub fn test_swap_after_fixed_program() {
        let d = date("2024-01-15");
        let now = at("2024-01-15", "00:30:00");
        let a = program(1, d, "00:00", 3600);
        let b = program(2, d, "01:00", 1200);
        let c = program(3, d, "01:20", 1800);
        assert!(Liveness::of(&a, now).is_fixed());

        let result = reflow(&[a.clone(), c, b], now, d);
        assert_eq!(result.updated[0], a);
        assert_eq!(
            times(&result.updated),
            vec![
                (1, "00:00".to_string(), "01:00".to_string()),
                (3, "01:00".to_string(), "01:30".to_string()),
                (2, "01:30".to_string(), "01:50".to_string()),
            ]
        );
        assert_eq!(result.changed.len(), 2);
        assert_eq!(
            result.rewrites,
            vec![
                TimeRange {
                    id: 3,
                    starts_at: at("2024-01-15", "01:00:00"),
                    ends_at: at("2024-01-15", "01:30:00"),
                },
                TimeRange {
                    id: 2,
                    starts_at: at("2024-01-15", "01:30:00"),
                    ends_at: at("2024-01-15", "01:50:00"),
                },
            ]
        );
    }

    #[test]
    pub fn test_future_day_reflows_from_midnight() {
        let d = date("2024-01-16");
        let now = at("2024-01-15", "12:00:00");
        let day = vec![
            program(1, d, "00:00", 600),
            program(2, d, "00:10", 1200),
            program(3, d, "00:30", 300),
        ];

        let result = reflow(&[day[2].clone(), day[0].clone(), day[1].clone()], now, d);
        assert_eq!(
            times(&result.updated),
            vec![
                (3, "00:00".to_string(), "00:05".to_string()),
                (1, "00:05".to_string(), "00:15".to_string()),
                (2, "00:15".to_string(), "00:35".to_string()),
            ]
        );
        assert_eq!(result.changed.len(), 3);
    }

    #[test]
    pub fn test_reflow_is_idempotent() {
        let d = date("2024-01-15");
        let now = at("2024-01-15", "00:30:00");
        let day = vec![
            program(1, d, "00:00", 3600),
            program(3, d, "01:20", 1800),
            program(2, d, "01:00", 1200),
        ];

        let first = reflow(&day, now, d);
        assert!(!first.is_noop());

        let second = reflow(&first.updated, now, d);
        assert_eq!(second.updated, first.updated);
        assert!(second.is_noop());
        assert!(second.rewrites.is_empty());
    }

    #[test]
    pub fn test_fixed_programs_never_move() {
        let d = date("2024-01-15");
        let now = at("2024-01-15", "10:15:00");
        let day = vec![
            program(1, d, "09:00", 3600),
            program(4, d, "11:30", 600),
            program(2, d, "10:00", 1800),
            program(3, d, "10:30", 3600),
        ];

        let result = reflow(&day, now, d);
        for (before, after) in day.iter().zip(&result.updated) {
            if !is_future(before, now) {
                assert_eq!(before, after);
            }
        }
        let changed: Vec<_> = result.changed.iter().map(|p| p.id).collect();
        assert_eq!(changed, vec![4]);
    }

    #[test]
    pub fn test_future_programs_are_contiguous() {
        let d = date("2024-01-15");
        let now = at("2024-01-15", "10:15:00");
        let day = vec![
            program(1, d, "09:00", 3600),
            program(2, d, "10:00", 1800),
            program(5, d, "14:00", 900),
            program(3, d, "10:30", 3600),
            program(4, d, "11:30", 600),
        ];

        let result = reflow(&day, now, d);
        let future: Vec<_> = result
            .updated
            .iter()
            .filter(|p| p.id != 1 && p.id != 2)
            .collect();
        for pair in future.windows(2) {
            assert_eq!(pair[1].start_time, pair[0].end_time);
        }
        assert_eq!(future[0].start_time.to_string(), "10:30");
    }

    #[test]
    pub fn test_other_days_pass_through() {
        let d = date("2024-01-15");
        let now = at("2024-01-15", "08:00:00");
        let tomorrow = program(9, date("2024-01-16"), "00:00", 600);
        let day = vec![program(1, d, "12:00", 600), tomorrow.clone()];

        let result = reflow(&day, now, d);
        assert_eq!(result.updated[1], tomorrow);
        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].start_time.to_string(), "00:00");
    }

    #[test]
    pub fn test_overflow_is_allowed() {
        let d = date("2024-01-15");
        let now = at("2024-01-14", "08:00:00");
        let day = vec![program(1, d, "00:00", 86_000), program(2, d, "23:53", 1200)];

        let result = reflow(&[day[1].clone(), day[0].clone()], now, d);
        assert_eq!(result.rewrites[1].ends_at, at("2024-01-16", "00:13:20"));
        assert_eq!(result.updated[1].end_time.to_string(), "00:13");
    }

    #[test]
    pub fn test_chain() {
        let ranges = chain(at("2024-01-15", "23:00:00"), [(1, 1800), (2, 3600)]);
        assert_eq!(ranges[0].ends_at, at("2024-01-15", "23:30:00"));
        assert_eq!(ranges[1].starts_at, at("2024-01-15", "23:30:00"));
        assert_eq!(ranges[1].ends_at, at("2024-01-16", "00:30:00"));
    }
}
