use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::clock::{self, ClockTime, SECONDS_PER_DAY};
use crate::liveness;
use crate::program::Program;

/// The programs tagged with `date`, ordered by start time.
///
/// The sort is stable, so programs sharing a start time keep their input order.
pub fn programs_for_date(all: &[Program], date: NaiveDate) -> Vec<Program> {
    let mut programs: Vec<Program> = all.iter().filter(|p| p.date == date).cloned().collect();
    programs.sort_by_key(|p| p.start_time);
    programs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Daypart {
    /// 00:00 to 06:00.
    Night,
    /// 06:00 to 12:00.
    Morning,
    /// 12:00 to 18:00.
    Afternoon,
    /// 18:00 to 24:00.
    Evening,
}

impl Daypart {
    pub fn of(time: ClockTime) -> Self {
        match time.hour() {
            0..=5 => Daypart::Night,
            6..=11 => Daypart::Morning,
            12..=17 => Daypart::Afternoon,
            _ => Daypart::Evening,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dayparts {
    pub night: Vec<Program>,
    pub morning: Vec<Program>,
    pub afternoon: Vec<Program>,
    pub evening: Vec<Program>,
}

impl Dayparts {
    pub fn get(&self, part: Daypart) -> &[Program] {
        match part {
            Daypart::Night => &self.night,
            Daypart::Morning => &self.morning,
            Daypart::Afternoon => &self.afternoon,
            Daypart::Evening => &self.evening,
        }
    }

    fn get_mut(&mut self, part: Daypart) -> &mut Vec<Program> {
        match part {
            Daypart::Night => &mut self.night,
            Daypart::Morning => &mut self.morning,
            Daypart::Afternoon => &mut self.afternoon,
            Daypart::Evening => &mut self.evening,
        }
    }

    pub fn len(&self) -> usize {
        self.night.len() + self.morning.len() + self.afternoon.len() + self.evening.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buckets programs by the hour they start in, each bucket sorted by start time.
pub fn group_by_daypart(programs: &[Program]) -> Dayparts {
    let mut parts = Dayparts::default();
    for program in programs {
        parts
            .get_mut(Daypart::of(program.start_time))
            .push(program.clone());
    }

    for part in [
        Daypart::Night,
        Daypart::Morning,
        Daypart::Afternoon,
        Daypart::Evening,
    ] {
        parts.get_mut(part).sort_by_key(|p| p.start_time);
    }
    parts
}

/// Whether the program's real span touches `date`'s `[00:00, 23:59:59.999]` window.
pub fn overlaps_date(program: &Program, date: NaiveDate) -> bool {
    overlaps(program.starts_at(), program.ends_at(), date)
}

pub(crate) fn overlaps(starts_at: NaiveDateTime, ends_at: NaiveDateTime, date: NaiveDate) -> bool {
    starts_at <= clock::day_end(date) && ends_at >= clock::day_start(date)
}

/// A display copy of `program` retagged to `date`, with bounds outside the day shown as
/// `00:00` and `24:00`. Never write the result back to storage.
pub fn clip_to_day(program: &Program, date: NaiveDate) -> Program {
    let starts_at = program.starts_at();
    let ends_at = program.ends_at();

    let mut clipped = program.clone();
    clipped.date = date;
    clipped.start_time = if starts_at < clock::day_start(date) {
        ClockTime::MIDNIGHT
    } else {
        clock::project(date, starts_at)
    };
    clipped.end_time = if ends_at > clock::day_end(date) {
        ClockTime::END_OF_DAY
    } else {
        clock::project(date, ends_at)
    };
    clipped
}

/// The viewer grid for `date`: every overlapping program, by real start, clipped to the day.
pub fn grid_for_date(all: &[Program], date: NaiveDate) -> Vec<Program> {
    let mut overlapping: Vec<&Program> = all.iter().filter(|p| overlaps_date(p, date)).collect();
    overlapping.sort_by_key(|p| p.starts_at());
    overlapping
        .into_iter()
        .map(|p| clip_to_day(p, date))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: NaiveDate,
    pub total_seconds: u32,
    /// Seconds still needed to fill 24 hours.
    pub missing_seconds: u32,
    pub is_full: bool,
    pub current: Option<Program>,
}

impl DayStats {
    pub fn compute(day_programs: &[Program], date: NaiveDate, now: NaiveDateTime) -> Self {
        let day: Vec<&Program> = day_programs.iter().filter(|p| p.date == date).collect();
        let total_seconds = day
            .iter()
            .fold(0u32, |total, p| total.saturating_add(p.duration));
        let missing_seconds = SECONDS_PER_DAY.saturating_sub(total_seconds);

        Self {
            date,
            total_seconds,
            missing_seconds,
            is_full: missing_seconds == 0,
            current: day
                .into_iter()
                .find(|p| liveness::is_live(p, now))
                .cloned(),
        }
    }
}
