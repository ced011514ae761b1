use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::clock::{self, ClockTime};

pub type ProgramId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub logo: String,
    pub color: String,
}

impl Channel {
    /// A channel whose slug is its id, with a logo derived from the name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        let logo = name.chars().take(2).collect::<String>().to_uppercase();

        Self {
            slug: id.clone(),
            id,
            name,
            description: String::new(),
            logo,
            color: "#000000".to_string(),
        }
    }
}

/// One scheduled airing on a channel, in the split `date` + time-of-day representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    pub video_id: String,
    /// Seconds of wall-clock time the program occupies.
    pub duration: u32,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl Program {
    /// Places an airing of `details.duration` seconds from `starts_at`, tagged with the
    /// calendar date of its start.
    pub fn starting_at(id: ProgramId, details: ProgramDetails, starts_at: NaiveDateTime) -> Self {
        let date = starts_at.date();
        let ends_at = starts_at + TimeDelta::seconds(i64::from(details.duration));

        Self {
            id,
            channel_id: details.channel_id,
            title: details.title,
            description: details.description,
            thumbnail: details.thumbnail,
            video_id: details.video_id,
            duration: details.duration,
            date,
            start_time: ClockTime::from(starts_at.time()),
            end_time: clock::project(date, ends_at),
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.start_time.on(self.date)
    }

    /// The end instant. `end_time` wraps around the dial, so the end is always derived from
    /// the duration, which also covers programs of a day or longer.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at() + TimeDelta::seconds(i64::from(self.duration))
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            id: self.id,
            starts_at: self.starts_at(),
            ends_at: self.ends_at(),
        }
    }
}

/// Descriptive fields shared by stored programs and creation requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDetails {
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub video_id: String,
    pub duration: u32,
    #[serde(default)]
    pub thumbnail: String,
}

/// A creation request for the storage collaborator, using its wire field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProgram {
    #[serde(flatten)]
    pub details: ProgramDetails,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl NewProgram {
    /// A request occupying `details.duration` seconds from `starts_at`.
    pub fn starting_at(details: ProgramDetails, starts_at: NaiveDateTime) -> Self {
        let end_time = starts_at + TimeDelta::seconds(i64::from(details.duration));
        Self {
            details,
            start_time: starts_at,
            end_time,
        }
    }
}

/// The only fields an explicit edit may change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ProgramUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// New absolute bounds for one program, as written by a bulk time rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub id: ProgramId,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}
