use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::program::{
    Channel, NewProgram, Program, ProgramDetails, ProgramId, ProgramUpdate, TimeRange,
};
use crate::store::ProgramStore;

const PROGRAM_COLUMNS: &str =
    "id, channel_id, title, description, video_id, duration, start_time, thumbnail";

/// SQLite-backed schedule storage.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn memory() -> Result<Self> {
        // Construct a new SQLite database in-memory.
        let db = Connection::open_in_memory()?;
        Self::setup(db)
    }

    pub fn file<P: AsRef<Path>>(file: P) -> Result<Self> {
        info!(path = %file.as_ref().display(), "opening schedule database");
        let db = Connection::open(file)?;
        Self::setup(db)
    }

    fn setup(db: Connection) -> Result<Self> {
        setup_connection(&db)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite itself inconsistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn setup_connection(db: &Connection) -> Result<()> {
    db.execute_batch(
        r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS channels (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                logo TEXT NOT NULL,
                color TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS programs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                video_id TEXT NOT NULL,
                duration INTEGER NOT NULL,
                start_time DATETIME NOT NULL,
                end_time DATETIME NOT NULL,
                thumbnail TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS programs_channel_start
                ON programs (channel_id, start_time);
            "#,
    )?;
    Ok(())
}

fn program_from_row(row: &Row<'_>) -> rusqlite::Result<Program> {
    let details = ProgramDetails {
        channel_id: row.get("channel_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        video_id: row.get("video_id")?,
        duration: row.get("duration")?,
        thumbnail: row.get("thumbnail")?,
    };

    // The stored end is only for range queries. Programs derive it from the duration.
    Ok(Program::starting_at(row.get("id")?, details, row.get("start_time")?))
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        logo: row.get("logo")?,
        color: row.get("color")?,
    })
}

fn query_programs<P: rusqlite::Params>(
    db: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<Program>> {
    let sql = format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE {filter}");
    let mut stmt = db.prepare(&sql)?;
    let rows = stmt
        .query_map(params, program_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn query_program<P: rusqlite::Params>(
    db: &Connection,
    filter: &str,
    params: P,
) -> Result<Option<Program>> {
    let sql = format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE {filter} LIMIT 1");
    let program = db.query_row(&sql, params, program_from_row).optional()?;
    Ok(program)
}

fn insert(db: &Connection, program: &NewProgram) -> Result<ProgramId> {
    let details = &program.details;
    db.execute(
        "INSERT INTO programs
            (channel_id, title, description, video_id, duration, start_time, end_time, thumbnail)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            details.channel_id,
            details.title,
            details.description,
            details.video_id,
            details.duration,
            program.start_time,
            program.end_time,
            details.thumbnail,
        ],
    )?;
    Ok(db.last_insert_rowid())
}

fn not_found(id: ProgramId) -> Error {
    Error::NotFound(format!("program {id}"))
}

impl ProgramStore for Database {
    fn channels(&self) -> Result<Vec<Channel>> {
        let db = self.conn();
        let mut stmt = db.prepare("SELECT * FROM channels ORDER BY name")?;
        let channels = stmt
            .query_map([], channel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(channels)
    }

    fn channel(&self, id: &str) -> Result<Channel> {
        let db = self.conn();
        db.query_row("SELECT * FROM channels WHERE id = ?1", [id], channel_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("channel {id}")))
    }

    fn upsert_channel(&self, channel: &Channel) -> Result<()> {
        let db = self.conn();
        db.execute(
            "INSERT INTO channels (id, name, slug, description, logo, color)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                slug = excluded.slug,
                description = excluded.description,
                logo = excluded.logo,
                color = excluded.color",
            params![
                channel.id,
                channel.name,
                channel.slug,
                channel.description,
                channel.logo,
                channel.color,
            ],
        )?;
        Ok(())
    }

    fn programs_for_channel(&self, channel_id: &str, since: NaiveDateTime) -> Result<Vec<Program>> {
        let db = self.conn();
        query_programs(
            &db,
            "channel_id = ?1 AND datetime(end_time) >= datetime(?2)
             ORDER BY datetime(start_time), id",
            params![channel_id, since],
        )
    }

    fn programs_overlapping(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Program>> {
        let db = self.conn();
        query_programs(
            &db,
            "datetime(start_time) <= datetime(?2) AND datetime(end_time) >= datetime(?1)
             ORDER BY datetime(start_time), id",
            params![from, to],
        )
    }

    fn program(&self, id: ProgramId) -> Result<Program> {
        let db = self.conn();
        query_program(&db, "id = ?1", [id])?.ok_or_else(|| not_found(id))
    }

    fn insert_program(&self, program: &NewProgram) -> Result<Program> {
        let db = self.conn();
        let id = insert(&db, program)?;
        debug!(id, channel = %program.details.channel_id, "inserted program");
        query_program(&db, "id = ?1", [id])?.ok_or_else(|| not_found(id))
    }

    fn insert_programs(&self, programs: &[NewProgram]) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        for program in programs {
            insert(&tx, program)?;
        }
        tx.commit()?;
        Ok(programs.len())
    }

    fn delete_program(&self, id: ProgramId) -> Result<()> {
        let db = self.conn();
        match db.execute("DELETE FROM programs WHERE id = ?1", [id])? {
            0 => Err(not_found(id)),
            _ => Ok(()),
        }
    }

    fn delete_programs(&self, ids: &[ProgramId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let db = self.conn();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let deleted = db.execute(
            &format!("DELETE FROM programs WHERE id IN ({placeholders})"),
            params_from_iter(ids),
        )?;
        Ok(deleted)
    }

    fn delete_channel_programs(&self, channel_id: &str) -> Result<usize> {
        let db = self.conn();
        let deleted = db.execute("DELETE FROM programs WHERE channel_id = ?1", [channel_id])?;
        Ok(deleted)
    }

    fn update_program(&self, id: ProgramId, update: &ProgramUpdate) -> Result<Program> {
        let db = self.conn();
        let updated = db.execute(
            "UPDATE programs
             SET title = COALESCE(?2, title), description = COALESCE(?3, description)
             WHERE id = ?1",
            params![id, update.title, update.description],
        )?;
        if updated == 0 {
            return Err(not_found(id));
        }
        query_program(&db, "id = ?1", [id])?.ok_or_else(|| not_found(id))
    }

    fn rewrite_time_ranges(&self, ranges: &[TimeRange]) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        {
            let mut stmt =
                tx.prepare("UPDATE programs SET start_time = ?2, end_time = ?3 WHERE id = ?1")?;
            for range in ranges {
                if stmt.execute(params![range.id, range.starts_at, range.ends_at])? == 0 {
                    // Dropping the transaction rolls back every earlier update.
                    return Err(not_found(range.id));
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn last_program(&self, channel_id: &str) -> Result<Option<Program>> {
        let db = self.conn();
        query_program(
            &db,
            "channel_id = ?1 ORDER BY datetime(end_time) DESC, id DESC",
            [channel_id],
        )
    }

    fn program_at(&self, channel_id: &str, at: NaiveDateTime) -> Result<Option<Program>> {
        let db = self.conn();
        query_program(
            &db,
            "channel_id = ?1
             AND datetime(start_time) <= datetime(?2)
             AND datetime(end_time) > datetime(?2)
             ORDER BY datetime(start_time), id",
            params![channel_id, at],
        )
    }

    fn next_program(&self, channel_id: &str, at: NaiveDateTime) -> Result<Option<Program>> {
        let db = self.conn();
        query_program(
            &db,
            "channel_id = ?1 AND datetime(start_time) >= datetime(?2)
             ORDER BY datetime(start_time), id",
            params![channel_id, at],
        )
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeDelta;

    use crate::program::fixture::{at, date};

    use super::*;

    fn seeded() -> Database {
        let db = Database::memory().unwrap();
        db.upsert_channel(&Channel::new("music-box", "MusicBox")).unwrap();
        db
    }

    fn request(title: &str, starts_at: NaiveDateTime, duration: u32) -> NewProgram {
        NewProgram::starting_at(
            ProgramDetails {
                channel_id: "music-box".to_string(),
                title: title.to_string(),
                description: String::new(),
                video_id: "dQw4w9WgXcQ".to_string(),
                duration,
                thumbnail: String::new(),
            },
            starts_at,
        )
    }

    #[test]
    pub fn test_init() {
        let db = Database::memory().unwrap();
        let conn = db.conn();
        let count: usize = conn
            .query_row_and_then("select count(*) as counter FROM programs", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_eq!(count, 0);
    }

    #[test]
    pub fn test_channels() {
        let db = seeded();
        let mut channel = Channel::new("music-box", "MusicBox");
        channel.color = "#f59e0b".to_string();
        db.upsert_channel(&channel).unwrap();

        assert_eq!(db.channels().unwrap(), vec![channel.clone()]);
        assert_eq!(db.channel("music-box").unwrap().logo, "MU");
        assert!(matches!(db.channel("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    pub fn test_rw() {
        let db = seeded();
        let t1 = at("2024-01-15", "23:30:00");

        let stored = db.insert_program(&request("late", t1, 3600)).unwrap();
        assert_eq!(stored.date, date("2024-01-15"));
        assert_eq!(stored.start_time.to_string(), "23:30");
        assert_eq!(stored.end_time.to_string(), "00:30");
        assert_eq!(stored.ends_at(), at("2024-01-16", "00:30:00"));
        assert_eq!(db.program(stored.id).unwrap(), stored);

        let early = db.insert_program(&request("early", at("2024-01-15", "08:00:00"), 600)).unwrap();
        let listed = db
            .programs_for_channel("music-box", at("2024-01-01", "00:00:00"))
            .unwrap();
        assert_eq!(listed, vec![early.clone(), stored.clone()]);

        let recent = db
            .programs_for_channel("music-box", at("2024-01-15", "09:00:00"))
            .unwrap();
        assert_eq!(recent, vec![stored.clone()]);

        let next_day = db
            .programs_overlapping(at("2024-01-16", "00:00:00"), at("2024-01-16", "23:59:59"))
            .unwrap();
        assert_eq!(next_day, vec![stored]);
    }

    #[test]
    pub fn test_rw_longer_than_a_day() {
        let db = seeded();
        let stored = db
            .insert_program(&request("marathon", at("2024-01-15", "10:00:00"), 2 * 86_400 + 600))
            .unwrap();
        assert_eq!(stored.end_time.to_string(), "10:10");
        assert_eq!(stored.ends_at(), at("2024-01-17", "10:10:00"));

        let read = db.program(stored.id).unwrap();
        assert_eq!(read.ends_at(), at("2024-01-17", "10:10:00"));
        assert_eq!(db.last_program("music-box").unwrap(), Some(read));
    }

    #[test]
    pub fn test_insert_rejects_unknown_channel() {
        let db = Database::memory().unwrap();
        let result = db.insert_program(&request("x", at("2024-01-15", "08:00:00"), 60));
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[test]
    pub fn test_update_and_delete() {
        let db = seeded();
        let p = db.insert_program(&request("a", at("2024-01-15", "08:00:00"), 600)).unwrap();
        let q = db.insert_program(&request("b", at("2024-01-15", "08:10:00"), 600)).unwrap();
        let r = db.insert_program(&request("c", at("2024-01-15", "08:20:00"), 600)).unwrap();

        let updated = db
            .update_program(
                p.id,
                &ProgramUpdate {
                    title: Some("renamed".to_string()),
                    description: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.start_time, p.start_time);
        assert!(matches!(
            db.update_program(999, &ProgramUpdate::default()),
            Err(Error::NotFound(_))
        ));

        db.delete_program(p.id).unwrap();
        assert!(matches!(db.delete_program(p.id), Err(Error::NotFound(_))));
        assert_eq!(db.delete_programs(&[q.id, r.id, 999]).unwrap(), 2);
        assert_eq!(db.delete_programs(&[]).unwrap(), 0);
    }

    #[test]
    pub fn test_rewrite_is_atomic() {
        let db = seeded();
        let p = db.insert_program(&request("a", at("2024-01-15", "08:00:00"), 600)).unwrap();

        let moved = TimeRange {
            id: p.id,
            starts_at: at("2024-01-15", "09:00:00"),
            ends_at: at("2024-01-15", "09:10:00"),
        };
        let missing = TimeRange { id: 999, ..moved };
        assert!(matches!(
            db.rewrite_time_ranges(&[moved, missing]),
            Err(Error::NotFound(_))
        ));
        assert_eq!(db.program(p.id).unwrap(), p);

        db.rewrite_time_ranges(&[moved]).unwrap();
        assert_eq!(db.program(p.id).unwrap().start_time.to_string(), "09:00");
    }

    #[test]
    pub fn test_current_and_next() {
        let db = seeded();
        let start = at("2024-01-15", "10:00:00");
        let a = db.insert_program(&request("a", start, 1800)).unwrap();
        let b = db
            .insert_program(&request("b", start + TimeDelta::minutes(30), 1800))
            .unwrap();

        let now = at("2024-01-15", "10:29:59");
        assert_eq!(db.program_at("music-box", now).unwrap(), Some(a.clone()));
        assert_eq!(db.next_program("music-box", a.ends_at()).unwrap(), Some(b.clone()));
        assert_eq!(db.program_at("music-box", b.ends_at()).unwrap(), None);
        assert_eq!(db.last_program("music-box").unwrap(), Some(b));
        assert_eq!(db.last_program("other").unwrap(), None);

        assert_eq!(db.delete_channel_programs("music-box").unwrap(), 2);
    }
}
