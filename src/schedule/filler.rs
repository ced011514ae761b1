use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::clock::{self, ClockTime};
use crate::error::{Error, Result};
use crate::program::{NewProgram, Program, ProgramDetails};
use crate::schedule::tail_anchor;

/// The slot a filler occupies: from the day's tail to the end of the day, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillerSlot {
    pub date: NaiveDate,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub duration: u32,
}

/// Measures from the tail to [clock::day_end], truncating the trailing millisecond, so the
/// filler ends at 23:59:59.
pub fn compute_filler(day_programs: &[Program], date: NaiveDate) -> Result<FillerSlot> {
    let starts_at = tail_anchor(day_programs, date);

    let duration = clock::seconds_between(starts_at, clock::day_end(date));
    if duration == 0 {
        return Err(Error::DayFull(date));
    }
    let ends_at = starts_at + TimeDelta::seconds(i64::from(duration));

    Ok(FillerSlot {
        date,
        starts_at,
        ends_at,
        start_time: clock::project(date, starts_at),
        end_time: clock::project(date, ends_at),
        duration,
    })
}

/// The fixed metadata every filler program is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filler {
    pub title: String,
    pub description: String,
    pub video_id: String,
    pub thumbnail: String,
}

impl Default for Filler {
    fn default() -> Self {
        let video_id = "ILzo07ipH40".to_string();
        Self {
            title: "Schedule Filler (Timer)".to_string(),
            description: "Automatically added filler video.".to_string(),
            thumbnail: format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg"),
            video_id,
        }
    }
}

impl Filler {
    pub fn request(&self, channel_id: &str, slot: &FillerSlot) -> NewProgram {
        NewProgram {
            details: ProgramDetails {
                channel_id: channel_id.to_string(),
                title: self.title.clone(),
                description: self.description.clone(),
                video_id: self.video_id.clone(),
                duration: slot.duration,
                thumbnail: self.thumbnail.clone(),
            },
            start_time: slot.starts_at,
            end_time: slot.ends_at,
        }
    }
}
