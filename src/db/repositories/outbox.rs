use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u32},
    models::PendingResult,
};
use crate::models::SurveySessionResult;

fn row_to_pending(row: &Row) -> Result<PendingResult> {
    let payload: String = row.get("payload_json")?;
    let attempts: i64 = row.get("attempts")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(PendingResult {
        id: row.get("id")?,
        result: serde_json::from_str(&payload).context("failed to decode queued result")?,
        attempts: to_u32(attempts, "attempts")?,
        last_error: row.get("last_error")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Stores an undelivered result and returns its outbox id.
    pub async fn enqueue_result(
        &self,
        result: &SurveySessionResult,
        last_error: &str,
        queued_at: DateTime<Utc>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(result).context("failed to encode result")?;
        let user_id = result.user_id.clone();
        let video_id = result.video_id.clone();
        let last_error = last_error.to_string();
        let row_id = id.clone();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO pending_results (id, user_id, video_id, payload_json, attempts, last_error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6)",
                params![
                    row_id,
                    user_id,
                    video_id,
                    payload,
                    last_error,
                    queued_at.to_rfc3339(),
                ],
            )
            .context("failed to insert pending result")?;
            Ok(())
        })
        .await?;

        Ok(id)
    }

    /// Oldest-first entries that have not yet used up `max_attempts`.
    pub async fn list_pending_results(&self, max_attempts: u32, limit: usize) -> Result<Vec<PendingResult>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, payload_json, attempts, last_error, created_at, updated_at
                 FROM pending_results
                 WHERE attempts < ?1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![i64::from(max_attempts), limit])?;
            let mut pending = Vec::new();
            let mut unreadable = Vec::new();
            while let Some(row) = rows.next()? {
                match row_to_pending(row) {
                    Ok(entry) => pending.push(entry),
                    Err(err) => {
                        let id: String = row.get("id")?;
                        warn!("Skipping unreadable outbox entry {id}: {err:#}");
                        unreadable.push((id, format!("{err:#}")));
                    }
                }
            }
            drop(rows);
            drop(stmt);

            // Exhaust unreadable entries so they stop occupying the batch.
            for (id, error) in unreadable {
                conn.execute(
                    "UPDATE pending_results SET attempts = ?1, last_error = ?2 WHERE id = ?3",
                    params![i64::from(max_attempts), error, id],
                )
                .context("failed to exhaust unreadable pending result")?;
            }
            Ok(pending)
        })
        .await
    }

    pub async fn record_failed_attempt(
        &self,
        id: &str,
        error: &str,
        attempted_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        let error = error.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE pending_results
                 SET attempts = attempts + 1,
                     last_error = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![error, attempted_at.to_rfc3339(), id],
            )
            .context("failed to record delivery attempt")?;
            Ok(())
        })
        .await
    }

    pub async fn delete_pending_result(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM pending_results WHERE id = ?1", params![id])
                .context("failed to delete pending result")?;
            Ok(())
        })
        .await
    }

    pub async fn count_pending_results(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM pending_results", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormData, QuestionnaireAnswers, WindowDimensions};

    fn result(video_id: &str) -> SurveySessionResult {
        SurveySessionResult {
            user_id: "participant-1".into(),
            video_id: video_id.into(),
            window_dimensions: WindowDimensions::new(1280, 720),
            gaze: Vec::new(),
            form_data: FormData::new(
                QuestionnaireAnswers {
                    hazard_detected: "no".into(),
                    no_detection_reason: "distracted".into(),
                    detection_confidence: 2.0,
                    hazard_severity: 1.0,
                    attention_factors: Vec::new(),
                },
                Vec::new(),
                0,
                15_000,
            ),
            num_surveys_completed: 1,
        }
    }

    fn open() -> (Database, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::new(dir.path().join("outbox.sqlite3")).unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn enqueue_list_and_delete() {
        let (db, _dir) = open();
        let first = db.enqueue_result(&result("a"), "503", Utc::now()).await.unwrap();
        db.enqueue_result(&result("b"), "503", Utc::now()).await.unwrap();

        let pending = db.list_pending_results(10, 10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first);
        assert_eq!(pending[0].result.video_id, "a");
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("503"));

        db.delete_pending_result(&first).await.unwrap();
        assert_eq!(db.count_pending_results().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreadable_payload_does_not_block_the_queue() {
        let (db, _dir) = open();
        db.execute(|conn| {
            conn.execute(
                "INSERT INTO pending_results (id, user_id, video_id, payload_json, attempts, last_error, created_at, updated_at)
                 VALUES ('broken', 'u', 'v', '{not json', 1, NULL, '2020-01-01T00:00:00+00:00', '2020-01-01T00:00:00+00:00')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();
        db.enqueue_result(&result("good"), "503", Utc::now()).await.unwrap();

        let pending = db.list_pending_results(10, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].result.video_id, "good");

        // The broken row is exhausted, not deleted.
        assert_eq!(db.count_pending_results().await.unwrap(), 2);
        assert_eq!(db.list_pending_results(10, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_entries_are_not_listed() {
        let (db, _dir) = open();
        let id = db.enqueue_result(&result("a"), "timeout", Utc::now()).await.unwrap();
        db.record_failed_attempt(&id, "timeout again", Utc::now()).await.unwrap();

        assert!(db.list_pending_results(2, 10).await.unwrap().is_empty());
        let pending = db.list_pending_results(3, 10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("timeout again"));
    }
}
