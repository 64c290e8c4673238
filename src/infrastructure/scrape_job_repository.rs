//! Scrape job persistence with guarded lifecycle transitions
//!
//! Every transition is a single conditional UPDATE that names the status it
//! expects to leave. A job that is no longer in that status, or that does not
//! exist at all, is left untouched and the attempt is logged, so the lifecycle
//! can only move forward: `pending -> running -> {completed, failed}`.

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{ScrapeJob, ScrapeJobStatus, ScrapeTargetType};

#[derive(Clone)]
pub struct ScrapeJobRepository {
    pool: Arc<SqlitePool>,
}

impl ScrapeJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Record a new pending job for a target URL
    pub async fn create_job(
        &self,
        target_url: &str,
        target_type: ScrapeTargetType,
        target_id: Option<&str>,
    ) -> Result<ScrapeJob> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO scrape_job
                (target_url, target_type, status, target_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(target_url)
        .bind(target_type.as_str())
        .bind(ScrapeJobStatus::Pending.as_str())
        .bind(target_id)
        .bind(now)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        let job = self.require_job(result.last_insert_rowid()).await?;
        debug!(job_id = job.id, target_type = %target_type, "created scrape job");
        Ok(job)
    }

    /// `pending -> running`, stamping `started_at`
    pub async fn mark_running(&self, job_id: i64) -> Result<Option<ScrapeJob>> {
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE scrape_job SET status = ?, started_at = ?, updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(ScrapeJobStatus::Running.as_str())
        .bind(now)
        .bind(now)
        .bind(job_id)
        .bind(ScrapeJobStatus::Pending.as_str())
        .execute(&*self.pool)
        .await?;

        self.settle(job_id, updated.rows_affected(), "start").await
    }

    /// `running -> completed`, stamping `finished_at` and the outcome payload
    pub async fn mark_completed(
        &self,
        job_id: i64,
        result: &serde_json::Value,
    ) -> Result<Option<ScrapeJob>> {
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE scrape_job SET status = ?, finished_at = ?, result = ?, updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(ScrapeJobStatus::Completed.as_str())
        .bind(now)
        .bind(serde_json::to_string(result)?)
        .bind(now)
        .bind(job_id)
        .bind(ScrapeJobStatus::Running.as_str())
        .execute(&*self.pool)
        .await?;

        self.settle(job_id, updated.rows_affected(), "completion").await
    }

    /// `running -> failed`, stamping `finished_at` and the error text
    pub async fn mark_failed(&self, job_id: i64, error_log: &str) -> Result<Option<ScrapeJob>> {
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE scrape_job SET status = ?, finished_at = ?, error_log = ?, updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(ScrapeJobStatus::Failed.as_str())
        .bind(now)
        .bind(error_log)
        .bind(now)
        .bind(job_id)
        .bind(ScrapeJobStatus::Running.as_str())
        .execute(&*self.pool)
        .await?;

        self.settle(job_id, updated.rows_affected(), "failure").await
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Option<ScrapeJob>> {
        let row = sqlx::query("SELECT * FROM scrape_job WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&*self.pool)
            .await?;
        row.map(|row| map_scrape_job(&row)).transpose()
    }

    /// Most recent jobs first, optionally filtered by status
    pub async fn list_jobs(
        &self,
        status: Option<ScrapeJobStatus>,
        limit: i64,
    ) -> Result<Vec<ScrapeJob>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM scrape_job WHERE status = ? ORDER BY id DESC LIMIT ?",
                )
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&*self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM scrape_job ORDER BY id DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&*self.pool)
                    .await?
            }
        };
        rows.iter().map(map_scrape_job).collect()
    }

    // Only for rows this repository just inserted; absence there is a bug.
    async fn require_job(&self, job_id: i64) -> Result<ScrapeJob> {
        self.get_job(job_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("scrape job not found: {job_id}"))
    }

    /// Resolve a transition attempt to the job's current row.
    ///
    /// A transition on a row in the wrong status or on a row that does not
    /// exist is a logged no-op, never an error; `None` means the row is gone.
    async fn settle(
        &self,
        job_id: i64,
        rows_affected: u64,
        transition: &str,
    ) -> Result<Option<ScrapeJob>> {
        let job = self.get_job(job_id).await?;
        if rows_affected == 0 {
            match &job {
                Some(job) => {
                    warn!(job_id, status = %job.status, "ignored {transition} of a job not in the expected status")
                }
                None => warn!(job_id, "ignored {transition} of a missing job"),
            }
        }
        Ok(job)
    }
}

fn map_scrape_job(row: &SqliteRow) -> Result<ScrapeJob> {
    let status_text: String = row.get("status");
    let status = ScrapeJobStatus::parse(&status_text)
        .ok_or_else(|| anyhow::anyhow!("unknown scrape job status: {status_text}"))?;
    let type_text: String = row.get("target_type");
    let target_type = ScrapeTargetType::parse(&type_text)
        .ok_or_else(|| anyhow::anyhow!("unknown scrape target type: {type_text}"))?;
    let result: Option<String> = row.get("result");

    Ok(ScrapeJob {
        id: row.get("id"),
        target_url: row.get("target_url"),
        target_type,
        status,
        target_id: row.get("target_id"),
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
        error_log: row.get("error_log"),
        result: result.map(|s| serde_json::from_str(&s)).transpose()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_repo() -> (TempDir, ScrapeJobRepository) {
        let temp_dir = TempDir::new().unwrap();
        let database_url = format!("sqlite:{}", temp_dir.path().join("test.db").display());
        let db = DatabaseConnection::new(&database_url).await.unwrap();
        db.initialize_schema().await.unwrap();
        (temp_dir, ScrapeJobRepository::new(db.pool().clone()))
    }

    #[tokio::test]
    async fn job_walks_the_full_success_lifecycle() {
        let (_dir, repo) = test_repo().await;

        let job = repo
            .create_job("https://example.com", ScrapeTargetType::Navigation, None)
            .await
            .unwrap();
        assert_eq!(job.status, ScrapeJobStatus::Pending);
        assert!(job.started_at.is_none());

        let job = repo.mark_running(job.id).await.unwrap().unwrap();
        assert_eq!(job.status, ScrapeJobStatus::Running);
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_none());

        let payload = json!({ "pages_visited": 1, "records_upserted": 4 });
        let job = repo.mark_completed(job.id, &payload).await.unwrap().unwrap();
        assert_eq!(job.status, ScrapeJobStatus::Completed);
        assert!(job.finished_at.is_some());
        assert_eq!(job.result, Some(payload));
        assert!(job.error_log.is_none());
    }

    #[tokio::test]
    async fn failure_records_error_text_verbatim() {
        let (_dir, repo) = test_repo().await;

        let job = repo
            .create_job(
                "https://example.com/p/x",
                ScrapeTargetType::ProductDetail,
                Some("42"),
            )
            .await
            .unwrap();
        repo.mark_running(job.id).await.unwrap();
        let job = repo
            .mark_failed(job.id, "page fetch timed out")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(job.status, ScrapeJobStatus::Failed);
        assert_eq!(job.error_log.as_deref(), Some("page fetch timed out"));
        assert_eq!(job.target_id.as_deref(), Some("42"));
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn terminal_states_reject_further_transitions() {
        let (_dir, repo) = test_repo().await;

        let job = repo
            .create_job("https://example.com", ScrapeTargetType::Category, None)
            .await
            .unwrap();
        repo.mark_running(job.id).await.unwrap();
        repo.mark_failed(job.id, "boom").await.unwrap();

        // Completing or restarting a failed job is a no-op.
        let after = repo.mark_completed(job.id, &json!({})).await.unwrap().unwrap();
        assert_eq!(after.status, ScrapeJobStatus::Failed);
        let after = repo.mark_running(job.id).await.unwrap().unwrap();
        assert_eq!(after.status, ScrapeJobStatus::Failed);
        assert_eq!(after.error_log.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn marking_a_missing_job_is_a_logged_noop() {
        let (_dir, repo) = test_repo().await;

        assert!(repo.mark_running(9999).await.unwrap().is_none());
        assert!(repo
            .mark_completed(9999, &json!({}))
            .await
            .unwrap()
            .is_none());
        assert!(repo.mark_failed(9999, "boom").await.unwrap().is_none());
        assert!(repo.get_job(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completion_requires_a_running_job() {
        let (_dir, repo) = test_repo().await;

        let job = repo
            .create_job("https://example.com", ScrapeTargetType::Product, None)
            .await
            .unwrap();
        // Skipping the running phase leaves the job pending.
        let after = repo.mark_completed(job.id, &json!({})).await.unwrap().unwrap();
        assert_eq!(after.status, ScrapeJobStatus::Pending);
        assert!(after.finished_at.is_none());
    }

    #[tokio::test]
    async fn list_jobs_filters_by_status_newest_first() {
        let (_dir, repo) = test_repo().await;

        for i in 0..3 {
            let job = repo
                .create_job(
                    &format!("https://example.com/{i}"),
                    ScrapeTargetType::Navigation,
                    None,
                )
                .await
                .unwrap();
            if i == 1 {
                repo.mark_running(job.id).await.unwrap();
            }
        }

        let pending = repo
            .list_jobs(Some(ScrapeJobStatus::Pending), 10)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].id > pending[1].id);

        let all = repo.list_jobs(None, 2).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
