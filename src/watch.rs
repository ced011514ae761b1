//! Viewer-side now-playing poller.
//!
//! A [Viewer] holds what the player shows for one channel. Responses to fetches are tagged
//! with the generation they were issued in, so a response that arrives after the viewer has
//! switched channels is dropped instead of overwriting the newer state.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::liveness;
use crate::program::{Program, ProgramId};
use crate::service::{NowPlaying, ScheduleService};
use crate::store::ProgramStore;

/// Identifies the fetch a response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    channel_id: String,
}

impl Ticket {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The response was for an older generation and was ignored.
    Stale,
    /// Same program as before; the player keeps its position.
    Unchanged,
    /// A different program (or none) is airing; the player seeks to the new offset.
    Switched,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Percent of the current program already aired.
    pub progress: Option<f64>,
    /// The current program has finished and a fetch should go out now.
    pub refetch: bool,
}

#[derive(Debug, Clone)]
pub struct Viewer {
    channel_id: String,
    generation: u64,
    playing: NowPlaying,
    /// Where the player was told to start the current program.
    offset_seconds: u32,
    refetch_requested: bool,
}

impl Viewer {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            generation: 0,
            playing: NowPlaying::default(),
            offset_seconds: 0,
            refetch_requested: false,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn current(&self) -> Option<&Program> {
        self.playing.current.as_ref()
    }

    pub fn next(&self) -> Option<&Program> {
        self.playing.next.as_ref()
    }

    pub fn offset_seconds(&self) -> u32 {
        self.offset_seconds
    }

    pub fn begin_fetch(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            channel_id: self.channel_id.clone(),
        }
    }

    /// Moves to another channel. Fetches still in flight for the old one become stale.
    pub fn switch_channel(&mut self, channel_id: impl Into<String>) {
        self.generation += 1;
        self.channel_id = channel_id.into();
        self.playing = NowPlaying::default();
        self.offset_seconds = 0;
        self.refetch_requested = false;
    }

    pub fn apply(&mut self, ticket: &Ticket, playing: NowPlaying) -> Applied {
        if ticket.generation != self.generation {
            return Applied::Stale;
        }

        let id = |p: &NowPlaying| -> Option<ProgramId> { p.current.as_ref().map(|c| c.id) };
        let switched = id(&self.playing) != id(&playing);
        if switched {
            self.offset_seconds = playing.offset_seconds;
        }
        self.playing = playing;
        self.refetch_requested = false;

        if switched {
            Applied::Switched
        } else {
            Applied::Unchanged
        }
    }

    /// Progress from the cached program. Asks for one refetch once it reaches 100%.
    pub fn tick(&mut self, now: NaiveDateTime) -> Tick {
        let progress = self.current().map(|program| liveness::progress(program, now));
        let finished = progress.is_some_and(|p| p >= 100.0);
        let refetch = finished && !self.refetch_requested;
        if refetch {
            self.refetch_requested = true;
        }
        Tick { progress, refetch }
    }
}

type Response = (Ticket, Result<NowPlaying>);

fn spawn_fetch<S: ProgramStore>(
    service: &ScheduleService<S>,
    viewer: &Viewer,
    responses: &mpsc::UnboundedSender<Response>,
) {
    let service = service.clone();
    let ticket = viewer.begin_fetch();
    let responses = responses.clone();

    tokio::spawn(async move {
        let channel_id = ticket.channel_id.clone();
        let fetched = tokio::task::spawn_blocking(move || {
            service.now_playing(&channel_id, Local::now().naive_local())
        })
        .await;

        let result = fetched.map_err(Error::from).and_then(|result| result);
        let _ = responses.send((ticket, result));
    });
}

fn announce(viewer: &Viewer) {
    match viewer.current() {
        Some(program) => info!(
            channel = viewer.channel_id(),
            id = program.id,
            title = %program.title,
            video_id = %program.video_id,
            offset = viewer.offset_seconds(),
            until = %program.end_time,
            "now playing"
        ),
        None => info!(channel = viewer.channel_id(), "nothing on air"),
    }
    if let Some(next) = viewer.next() {
        info!(id = next.id, title = %next.title, start = %next.start_time, "up next");
    }
}

/// Follows a channel until interrupted, polling every `poll` and ticking every second.
pub async fn run<S: ProgramStore>(
    service: ScheduleService<S>,
    channel_id: String,
    poll: Duration,
) -> Result<()> {
    service.store().channel(&channel_id)?;

    let mut viewer = Viewer::new(channel_id);
    let (responses, mut incoming) = mpsc::unbounded_channel::<Response>();
    let mut poll = tokio::time::interval(poll);
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll.tick() => spawn_fetch(&service, &viewer, &responses),
            _ = tick.tick() => {
                let tick = viewer.tick(Local::now().naive_local());
                if let Some(progress) = tick.progress {
                    debug!(progress = %format!("{progress:.1}"), "tick");
                }
                if tick.refetch {
                    debug!("program finished, refetching");
                    spawn_fetch(&service, &viewer, &responses);
                }
            }
            Some((ticket, result)) = incoming.recv() => match result {
                Ok(playing) => match viewer.apply(&ticket, playing) {
                    Applied::Switched => announce(&viewer),
                    Applied::Unchanged => debug!("still playing the same program"),
                    Applied::Stale => debug!(channel = ticket.channel_id(), "dropped stale response"),
                },
                Err(err) => warn!(error = %err, "failed to fetch now playing"),
            },
            _ = &mut shutdown => {
                info!("stopping viewer");
                return Ok(());
            }
        }
    }
}
