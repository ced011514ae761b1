use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate, TimeDelta};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tvguide::config::{ServeConfig, StoreConfig, WatchConfig};
use tvguide::program::Channel;
use tvguide::{seed, server, watch};

#[derive(Parser)]
#[command(version, about = "Broadcast-day scheduling for video channels")]
pub struct Cli {
    /// Log as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub store: StoreConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the admin and viewer HTTP API.
    Serve(ServeConfig),

    /// Fill a channel from a JSON catalog of videos.
    Seed {
        #[arg(long)]
        catalog: PathBuf,

        #[arg(long, default_value = "music-box")]
        channel: String,

        /// Display name, used when the channel does not exist yet.
        #[arg(long, default_value = "MusicBox")]
        name: String,

        #[arg(long, default_value_t = 10)]
        days: u32,

        /// First day to fill. Defaults to yesterday.
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        keep_existing: bool,
    },

    /// Follow what a channel is airing.
    Watch(WatchConfig),
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let service = cli.store.service()?;
    info!(database = %cli.store.database.display(), "opened schedule store");

    match cli.command {
        Command::Serve(config) => {
            server::serve(service, config.youtube()?, config.bind).await?;
        }
        Command::Seed {
            catalog,
            channel,
            name,
            days,
            from,
            keep_existing,
        } => {
            let entries = seed::load_catalog(&catalog)?;
            let from = from.unwrap_or_else(|| Local::now().date_naive() - TimeDelta::days(1));
            let store = service.store().clone();
            let options = seed::SeedOptions {
                channel: Channel::new(channel, name),
                from,
                days,
                keep_existing,
            };

            let report =
                tokio::task::spawn_blocking(move || seed::seed(&store, &entries, &options))
                    .await??;
            println!(
                "Seeded {} programs in {} batches, {} to {}",
                report.inserted, report.batches, report.starts_at, report.ends_at
            );
        }
        Command::Watch(config) => {
            watch::run(
                service,
                config.channel,
                Duration::from_secs(config.poll_seconds.max(1)),
            )
            .await?;
        }
    }

    Ok(())
}
