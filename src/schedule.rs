//! The broadcast-day scheduling core.
//!
//! Everything here is pure: callers pass the day's programs and an explicit `now`, and get
//! back placements or rewritten programs. Persisting the results is up to the caller.

use chrono::{NaiveDate, NaiveDateTime};

use crate::clock;
use crate::program::Program;

pub mod append;
pub mod day;
pub mod filler;
pub mod reflow;

pub use append::{append, Placement};
pub use day::{
    clip_to_day, grid_for_date, group_by_daypart, overlaps_date, programs_for_date, DayStats,
    Daypart, Dayparts,
};
pub use filler::{compute_filler, Filler, FillerSlot};
pub use reflow::{chain, reflow, Reflow};

/// Where the next program on `date` starts: the end of the day's last program by start time,
/// or midnight when the day is empty.
///
/// Programs tagged with other dates are ignored.
pub(crate) fn tail_anchor(programs: &[Program], date: NaiveDate) -> NaiveDateTime {
    programs
        .iter()
        .filter(|program| program.date == date)
        .max_by_key(|program| program.start_time)
        .map(Program::ends_at)
        .unwrap_or_else(|| clock::day_start(date))
}
