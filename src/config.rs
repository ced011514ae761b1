use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::db::Database;
use crate::error::Result;
use crate::schedule::Filler;
use crate::service::ScheduleService;
use crate::youtube::YouTubeClient;

#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// SQLite file holding channels and programs.
    #[arg(long, env = "TVGUIDE_DATABASE", default_value = "tvguide.db")]
    pub database: PathBuf,

    /// Days of history returned with a channel's programs.
    #[arg(long, env = "TVGUIDE_HISTORY_DAYS", default_value_t = 7)]
    pub history_days: u32,

    #[command(flatten)]
    pub filler: FillerConfig,
}

impl StoreConfig {
    pub fn open(&self) -> Result<Database> {
        Database::file(&self.database)
    }

    pub fn service(&self) -> Result<ScheduleService<Database>> {
        Ok(ScheduleService::new(self.open()?)
            .with_filler(self.filler.filler())
            .with_history_days(self.history_days))
    }
}

#[derive(Debug, Clone, Args)]
pub struct FillerConfig {
    #[arg(long = "filler-video-id", env = "TVGUIDE_FILLER_VIDEO_ID")]
    pub video_id: Option<String>,

    #[arg(long = "filler-title", env = "TVGUIDE_FILLER_TITLE")]
    pub title: Option<String>,

    #[arg(long = "filler-description", env = "TVGUIDE_FILLER_DESCRIPTION")]
    pub description: Option<String>,

    #[arg(long = "filler-thumbnail", env = "TVGUIDE_FILLER_THUMBNAIL")]
    pub thumbnail: Option<String>,
}

impl FillerConfig {
    pub fn filler(&self) -> Filler {
        let default = Filler::default();
        Filler {
            title: self.title.clone().unwrap_or(default.title),
            description: self.description.clone().unwrap_or(default.description),
            video_id: self.video_id.clone().unwrap_or(default.video_id),
            thumbnail: self.thumbnail.clone().unwrap_or(default.thumbnail),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    #[arg(long, env = "TVGUIDE_BIND", default_value = "127.0.0.1:3030")]
    pub bind: SocketAddr,

    /// Key for the YouTube Data API. Without it, adding videos by link fails.
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,
}

impl ServeConfig {
    pub fn youtube(&self) -> Result<YouTubeClient> {
        YouTubeClient::new(self.youtube_api_key.clone())
    }
}

#[derive(Debug, Clone, Args)]
pub struct WatchConfig {
    /// Channel to follow.
    pub channel: String,

    /// Seconds between now-playing fetches.
    #[arg(long = "poll-seconds", env = "TVGUIDE_POLL_SECONDS", default_value_t = 10)]
    pub poll_seconds: u64,
}
