use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::liveness::{self, Liveness};
use crate::program::{Program, ProgramId};
use crate::schedule::Reflow;
use crate::service::NowPlaying;

#[derive(Debug, Deserialize)]
pub(crate) struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GridQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddProgramBody {
    pub url: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub confirm_overflow: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FillerBody {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReorderBody {
    pub date: NaiveDate,
    pub order: Vec<ProgramId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteBody {
    pub ids: Vec<ProgramId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Deleted {
    pub deleted: usize,
}

/// A program with its liveness at the time of the request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgramView {
    #[serde(flatten)]
    pub program: Program,
    pub is_live: bool,
    pub is_past: bool,
}

impl ProgramView {
    pub fn at(program: Program, now: NaiveDateTime) -> Self {
        let liveness = Liveness::of(&program, now);
        Self {
            program,
            is_live: liveness == Liveness::Live,
            is_past: liveness == Liveness::Past,
        }
    }

    pub fn all(programs: Vec<Program>, now: NaiveDateTime) -> Vec<Self> {
        programs.into_iter().map(|p| Self::at(p, now)).collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NowPlayingView {
    #[serde(flatten)]
    pub playing: NowPlaying,
    pub progress: Option<f64>,
}

impl NowPlayingView {
    pub fn at(playing: NowPlaying, now: NaiveDateTime) -> Self {
        let progress = playing
            .current
            .as_ref()
            .map(|program| liveness::progress(program, now));
        Self { playing, progress }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Reordered {
    pub programs: Vec<Program>,
    pub changed: Vec<ProgramId>,
}

impl From<Reflow> for Reordered {
    fn from(reflow: Reflow) -> Self {
        Self {
            changed: reflow.changed.iter().map(|p| p.id).collect(),
            programs: reflow.updated,
        }
    }
}
