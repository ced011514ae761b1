use chrono::NaiveDateTime;

use crate::error::Result;
use crate::program::{Channel, NewProgram, Program, ProgramId, ProgramUpdate, TimeRange};

/// Persistence for channels and their programs.
///
/// Implementations return [Program] values already projected onto the broadcast day their
/// start falls in. Lookups that miss return [crate::Error::NotFound].
pub trait ProgramStore: Send + Sync + Clone + 'static {
    fn channels(&self) -> Result<Vec<Channel>>;

    fn channel(&self, id: &str) -> Result<Channel>;

    fn upsert_channel(&self, channel: &Channel) -> Result<()>;

    /// Programs of a channel ending at or after `since`, ordered by start.
    fn programs_for_channel(&self, channel_id: &str, since: NaiveDateTime) -> Result<Vec<Program>>;

    /// Programs of every channel whose span intersects `[from, to]`, ordered by start.
    fn programs_overlapping(&self, from: NaiveDateTime, to: NaiveDateTime)
        -> Result<Vec<Program>>;

    fn program(&self, id: ProgramId) -> Result<Program>;

    fn insert_program(&self, program: &NewProgram) -> Result<Program>;

    /// Inserts all requests or none of them.
    fn insert_programs(&self, programs: &[NewProgram]) -> Result<usize>;

    fn delete_program(&self, id: ProgramId) -> Result<()>;

    /// Deletes every listed program that exists and returns how many were removed.
    fn delete_programs(&self, ids: &[ProgramId]) -> Result<usize>;

    fn delete_channel_programs(&self, channel_id: &str) -> Result<usize>;

    fn update_program(&self, id: ProgramId, update: &ProgramUpdate) -> Result<Program>;

    /// Rewrites the bounds of every listed program atomically.
    fn rewrite_time_ranges(&self, ranges: &[TimeRange]) -> Result<()>;

    /// The channel's program with the latest end.
    fn last_program(&self, channel_id: &str) -> Result<Option<Program>>;

    /// The channel's program airing at `at`.
    fn program_at(&self, channel_id: &str, at: NaiveDateTime) -> Result<Option<Program>>;

    /// The channel's first program starting at or after `at`.
    fn next_program(&self, channel_id: &str, at: NaiveDateTime) -> Result<Option<Program>>;
}
