//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Progress and session code call store methods and never execute SQL directly.

use crate::{error::SurveyResult, event::{EventLogEntry, ProgressEvent}};
use rusqlite::{params, Connection};

mod progress;

pub struct SurveyStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SurveyStore {
    pub fn open(path: &str) -> SurveyResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SurveyResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> SurveyResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SurveyResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, revision: u64, event: &ProgressEvent) -> SurveyResult<()> {
        insert_event(&self.conn, revision, event)
    }

    /// Most recent `limit` events, oldest first.
    pub fn recent_events(&self, limit: usize) -> SurveyResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, revision, event_type, payload FROM (
                 SELECT id, revision, event_type, payload FROM event_log
                 ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn events_of_type(&self, event_type: &str) -> SurveyResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, revision, event_type, payload FROM event_log
             WHERE event_type = ?1 ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![event_type], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> SurveyResult<i64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
            params![event_type],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}

fn insert_event(conn: &Connection, revision: u64, event: &ProgressEvent) -> SurveyResult<()> {
    conn.execute(
        "INSERT INTO event_log (revision, event_type, payload) VALUES (?1, ?2, ?3)",
        params![revision as i64, event.type_name(), serde_json::to_string(event)?],
    )?;
    Ok(())
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventLogEntry> {
    Ok(EventLogEntry {
        id:         Some(row.get(0)?),
        revision:   row.get::<_, i64>(1)? as u64,
        event_type: row.get(2)?,
        payload:    row.get(3)?,
    })
}
