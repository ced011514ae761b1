use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::clock;
use crate::error::{Error, Result};
use crate::liveness::Liveness;
use crate::program::{Channel, NewProgram, Program, ProgramDetails, ProgramId, ProgramUpdate, TimeRange};
use crate::schedule::{self, DayStats, Dayparts, Filler, Reflow};
use crate::store::ProgramStore;
use crate::youtube::VideoDetails;

/// A broadcast day as the admin panel shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub stats: DayStats,
    pub dayparts: Dayparts,
}

/// What a channel is airing right now, and what follows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub current: Option<Program>,
    pub next: Option<Program>,
    /// Seconds since `current` started.
    pub offset_seconds: u32,
}

/// Schedule operations over a [ProgramStore].
#[derive(Clone)]
pub struct ScheduleService<S> {
    store: S,
    filler: Filler,
    history: TimeDelta,
}

impl<S: ProgramStore> ScheduleService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            filler: Filler::default(),
            history: TimeDelta::days(7),
        }
    }

    pub fn with_filler(mut self, filler: Filler) -> Self {
        self.filler = filler;
        self
    }

    /// How far back [ScheduleService::programs_for_channel] reaches.
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history = TimeDelta::days(i64::from(days));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn channels(&self) -> Result<Vec<Channel>> {
        self.store.channels()
    }

    /// The channel's programs from the history window onward.
    pub fn programs_for_channel(&self, channel_id: &str, now: NaiveDateTime) -> Result<Vec<Program>> {
        self.store.channel(channel_id)?;
        self.store.programs_for_channel(channel_id, now - self.history)
    }

    /// The programs tagged with `date`, by start time.
    pub fn day_programs(&self, channel_id: &str, date: NaiveDate) -> Result<Vec<Program>> {
        self.store.channel(channel_id)?;
        // Everything tagged with `date` starts on it, so it ends no earlier than its midnight.
        let candidates = self
            .store
            .programs_for_channel(channel_id, clock::day_start(date))?;
        Ok(schedule::programs_for_date(&candidates, date))
    }

    pub fn day_schedule(
        &self,
        channel_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<DaySchedule> {
        let day = self.day_programs(channel_id, date)?;
        Ok(DaySchedule {
            date,
            stats: DayStats::compute(&day, date, now),
            dayparts: schedule::group_by_daypart(&day),
        })
    }

    /// Every channel's programs overlapping `date`, clipped for display.
    pub fn grid(&self, date: NaiveDate) -> Result<Vec<Program>> {
        let overlapping = self
            .store
            .programs_overlapping(clock::day_start(date), clock::day_end(date))?;
        Ok(schedule::grid_for_date(&overlapping, date))
    }

    /// Appends a video after the last program of `date`.
    ///
    /// A program that would run past the end of the day is only created when
    /// `confirm_overflow` is set; otherwise this fails with [Error::Overflow].
    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    pub fn append_video(
        &self,
        channel_id: &str,
        date: NaiveDate,
        video: &VideoDetails,
        confirm_overflow: bool,
    ) -> Result<Program> {
        let day = self.day_programs(channel_id, date)?;
        let placement = schedule::append(&day, video.duration, date)?;

        if placement.overflow && !confirm_overflow {
            warn!(ends_at = %placement.ends_at, "append runs past the end of the day");
            return Err(Error::Overflow {
                date,
                ends_at: placement.ends_at,
            });
        }

        let request = NewProgram::starting_at(
            ProgramDetails {
                channel_id: channel_id.to_string(),
                title: video.title.clone(),
                description: video.description.clone(),
                video_id: video.video_id.clone(),
                duration: video.duration,
                thumbnail: video.thumbnail.clone(),
            },
            placement.starts_at,
        );
        let program = self.store.insert_program(&request)?;
        info!(
            id = program.id,
            start = %program.start_time,
            end = %program.end_time,
            overflow = placement.overflow,
            "appended program"
        );
        Ok(program)
    }

    /// Fills the rest of `date` with the configured filler video.
    #[instrument(skip(self))]
    pub fn add_filler(&self, channel_id: &str, date: NaiveDate) -> Result<Program> {
        let day = self.day_programs(channel_id, date)?;
        let slot = schedule::compute_filler(&day, date)?;

        let program = self
            .store
            .insert_program(&self.filler.request(channel_id, &slot))?;
        info!(id = program.id, start = %program.start_time, duration = slot.duration, "added filler");
        Ok(program)
    }

    /// Reorders `date` to match `order` and persists the programs that moved.
    ///
    /// `order` must list every program of the day exactly once and keep past and live
    /// programs where they are.
    #[instrument(skip(self, order))]
    pub fn reorder_day(
        &self,
        channel_id: &str,
        date: NaiveDate,
        order: &[ProgramId],
        now: NaiveDateTime,
    ) -> Result<Reflow> {
        let day = self.day_programs(channel_id, date)?;
        let ordered = arrange(&day, order, now)?;

        let result = schedule::reflow(&ordered, now, date);
        if result.is_noop() {
            info!("schedule already contiguous");
            return Ok(result);
        }

        self.store.rewrite_time_ranges(&result.rewrites)?;
        info!(changed = result.changed.len(), "rescheduled programs");
        Ok(result)
    }

    /// Lays `programs` back to back from `anchor` and rewrites their times in one batch.
    pub fn reorder_programs(
        &self,
        programs: &[Program],
        anchor: NaiveDateTime,
    ) -> Result<Vec<TimeRange>> {
        let ranges = schedule::chain(anchor, programs.iter().map(|p| (p.id, p.duration)));
        if let Some(first) = ranges.first() {
            info!(count = ranges.len(), from = %first.starts_at, "rewriting program times");
        }
        self.store.rewrite_time_ranges(&ranges)?;
        Ok(ranges)
    }

    pub fn update_program(&self, id: ProgramId, update: &ProgramUpdate) -> Result<Program> {
        if update.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }
        self.store.update_program(id, update)
    }

    pub fn delete_program(&self, id: ProgramId) -> Result<()> {
        self.store.delete_program(id)?;
        info!(id, "deleted program");
        Ok(())
    }

    pub fn delete_programs(&self, ids: &[ProgramId]) -> Result<usize> {
        let deleted = self.store.delete_programs(ids)?;
        info!(requested = ids.len(), deleted, "deleted programs");
        Ok(deleted)
    }

    pub fn last_program(&self, channel_id: &str) -> Result<Option<Program>> {
        self.store.last_program(channel_id)
    }

    pub fn now_playing(&self, channel_id: &str, now: NaiveDateTime) -> Result<NowPlaying> {
        match self.store.program_at(channel_id, now)? {
            Some(current) => {
                let next = self.store.next_program(channel_id, current.ends_at())?;
                Ok(NowPlaying {
                    offset_seconds: clock::seconds_between(current.starts_at(), now),
                    current: Some(current),
                    next,
                })
            }
            None => Ok(NowPlaying {
                current: None,
                next: self.store.next_program(channel_id, now)?,
                offset_seconds: 0,
            }),
        }
    }
}

/// Puts the day's programs in the requested order, refusing orders that drop, repeat or
/// invent programs or that move a past or live one.
fn arrange(day: &[Program], order: &[ProgramId], now: NaiveDateTime) -> Result<Vec<Program>> {
    if order.len() != day.len() {
        return Err(Error::InvalidInput(format!(
            "order lists {} programs but the day has {}",
            order.len(),
            day.len()
        )));
    }

    let mut by_id: HashMap<ProgramId, &Program> = day.iter().map(|p| (p.id, p)).collect();
    let mut ordered = Vec::with_capacity(order.len());
    for (position, id) in order.iter().enumerate() {
        let program = by_id.remove(id).ok_or_else(|| {
            Error::InvalidInput(format!("program {id} is not part of this day or is repeated"))
        })?;

        if Liveness::of(&day[position], now).is_fixed() && day[position].id != *id {
            return Err(Error::InvalidInput(format!(
                "program {} has already aired or is live and cannot be moved",
                day[position].id
            )));
        }
        ordered.push(program.clone());
    }
    Ok(ordered)
}
