use super::{insert_event, SurveyStore};
use crate::{
    error::SurveyResult,
    event::ProgressEvent,
    progress::UserProgress,
    types::PROGRESS_KEY,
};
use rusqlite::{params, Connection, OptionalExtension};

impl SurveyStore {
    // ── Progress snapshot ─────────────────────────────────────────

    /// Replace the whole persisted record. Last write wins.
    pub fn save_progress(&self, progress: &UserProgress, revision: u64) -> SurveyResult<()> {
        let json = serde_json::to_string(progress)?;
        self.save_raw_progress(&json, revision)
    }

    /// Write an arbitrary JSON payload under the progress key.
    /// Used by tests and tooling to plant hand-written snapshots.
    pub fn save_raw_progress(&self, state_json: &str, revision: u64) -> SurveyResult<()> {
        upsert_progress(&self.conn, state_json, revision)?;
        log::debug!("store: saved progress revision {revision}");
        Ok(())
    }

    /// Replace the record and log `event` in one transaction.
    /// Either both rows land or neither does.
    pub fn commit_progress(
        &self,
        progress: &UserProgress,
        revision: u64,
        event: &ProgressEvent,
    ) -> SurveyResult<()> {
        let json = serde_json::to_string(progress)?;
        let tx = self.conn.unchecked_transaction()?;
        upsert_progress(&tx, &json, revision)?;
        insert_event(&tx, revision, event)?;
        tx.commit()?;
        log::debug!("store: committed progress revision {revision} ({})", event.type_name());
        Ok(())
    }

    /// When the record was last written, as SQLite `CURRENT_TIMESTAMP` text.
    pub fn progress_saved_at(&self) -> SurveyResult<Option<String>> {
        let saved_at = self
            .conn
            .query_row(
                "SELECT saved_at FROM progress_snapshot WHERE key = ?1",
                params![PROGRESS_KEY],
                |r| r.get(0),
            )
            .optional()?;
        Ok(saved_at)
    }

    /// Read the persisted record and its revision.
    /// Absent and malformed snapshots both come back as None; a malformed
    /// one is logged and recorded as a SnapshotDiscarded event.
    pub fn load_progress(&self) -> SurveyResult<Option<(UserProgress, u64)>> {
        let row = self
            .conn
            .query_row(
                "SELECT state_json, revision FROM progress_snapshot WHERE key = ?1",
                params![PROGRESS_KEY],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as u64)),
            )
            .optional()?;

        let Some((json, revision)) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<UserProgress>(&json) {
            Ok(progress) => Ok(Some((progress, revision))),
            Err(e) => {
                log::warn!("store: discarding malformed progress snapshot: {e}");
                self.append_event(
                    revision,
                    &ProgressEvent::SnapshotDiscarded { reason: e.to_string() },
                )?;
                Ok(None)
            }
        }
    }

    pub fn has_progress(&self) -> SurveyResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM progress_snapshot WHERE key = ?1",
            params![PROGRESS_KEY],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    /// Drop the persisted record. The only reset path.
    pub fn clear_progress(&self) -> SurveyResult<()> {
        self.conn.execute(
            "DELETE FROM progress_snapshot WHERE key = ?1",
            params![PROGRESS_KEY],
        )?;
        Ok(())
    }
}

fn upsert_progress(conn: &Connection, state_json: &str, revision: u64) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO progress_snapshot (key, state_json, revision, saved_at)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
        params![PROGRESS_KEY, state_json, revision as i64],
    )
}
