//! Bulk-populating a channel from a static JSON catalog.
//!
//! Catalog entries are laid back to back, cycling through the catalog, from midnight of the
//! first day until the last day is covered.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Deserialize;
use tracing::{info, warn};

use crate::clock;
use crate::error::{Error, Result};
use crate::program::{Channel, NewProgram, ProgramDetails};
use crate::store::ProgramStore;
use crate::youtube::extract_video_id;

const BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Video url")]
    pub video_url: String,
    #[serde(rename = "Duration in seconds")]
    pub duration: u32,
    #[serde(rename = "Thumbnail url", default)]
    pub thumbnail: String,
}

pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogEntry>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|err| Error::Catalog(format!("{}: {err}", path.display())))?;
    parse_catalog(&raw)
}

pub fn parse_catalog(raw: &str) -> Result<Vec<CatalogEntry>> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(raw)?;
    if entries.iter().all(|entry| entry.duration == 0) {
        return Err(Error::Catalog(
            "catalog has no entry with a positive duration".to_string(),
        ));
    }
    Ok(entries)
}

pub struct SeedOptions {
    pub channel: Channel,
    /// The first day to fill, from its midnight.
    pub from: NaiveDate,
    pub days: u32,
    /// Keep the channel's existing programs and continue after the last one.
    pub keep_existing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub batches: usize,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

/// Chains catalog entries from `starts_at` until `until` is reached.
pub fn plan(
    catalog: &[CatalogEntry],
    channel_id: &str,
    starts_at: NaiveDateTime,
    until: NaiveDateTime,
) -> Vec<NewProgram> {
    let mut programs = Vec::new();
    if catalog.iter().all(|entry| entry.duration == 0) {
        return programs;
    }

    let mut current = starts_at;

    for entry in catalog.iter().cycle() {
        if current >= until {
            break;
        }
        if entry.duration == 0 {
            continue;
        }

        let request = NewProgram::starting_at(
            ProgramDetails {
                channel_id: channel_id.to_string(),
                title: entry.title.clone(),
                description: entry.description.clone(),
                video_id: extract_video_id(&entry.video_url).unwrap_or_default(),
                duration: entry.duration,
                thumbnail: entry.thumbnail.clone(),
            },
            current,
        );
        current = request.end_time;
        programs.push(request);
    }

    programs
}

pub fn seed<S: ProgramStore>(
    store: &S,
    catalog: &[CatalogEntry],
    options: &SeedOptions,
) -> Result<SeedReport> {
    let channel = &options.channel;
    store.upsert_channel(channel)?;
    info!(channel = %channel.id, "channel upserted");

    let mut starts_at = clock::day_start(options.from);
    if options.keep_existing {
        if let Some(last) = store.last_program(&channel.id)? {
            starts_at = starts_at.max(last.ends_at());
        }
    } else {
        let removed = store.delete_channel_programs(&channel.id)?;
        info!(channel = %channel.id, removed, "cleared existing programs");
    }

    let until = clock::day_start(options.from) + TimeDelta::days(i64::from(options.days));
    let programs = plan(catalog, &channel.id, starts_at, until);
    if programs.is_empty() {
        warn!(channel = %channel.id, "nothing to seed");
    }

    let mut batches = 0;
    for (index, batch) in programs.chunks(BATCH_SIZE).enumerate() {
        store.insert_programs(batch)?;
        batches += 1;
        info!(batch = index + 1, size = batch.len(), "inserted batch");
    }

    let ends_at = programs.last().map_or(starts_at, |p| p.end_time);
    info!(inserted = programs.len(), %starts_at, %ends_at, "seeding complete");

    Ok(SeedReport {
        inserted: programs.len(),
        batches,
        starts_at,
        ends_at,
    })
}
