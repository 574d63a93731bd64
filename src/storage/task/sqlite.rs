use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::TaskStorage;
use crate::storage::task::entity::Model as TaskModel;
use crate::web::Pagination;

pub struct SqliteTaskStorage {
    pool: SqlitePool,
}

impl SqliteTaskStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        info!("Initializing SQLite task storage at {}", database_url);
        let pool = sqlx::SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                source_filename TEXT NOT NULL,
                audio_path TEXT NOT NULL,
                status TEXT NOT NULL,
                language TEXT,
                transcript TEXT,
                error TEXT,
                transcribe_seconds REAL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    fn row_to_model(&self, row: sqlx::sqlite::SqliteRow) -> Result<TaskModel> {
        Ok(TaskModel {
            id: row.get("id"),
            source_filename: row.get("source_filename"),
            audio_path: row.get("audio_path"),
            status: row.get("status"),
            language: row.get("language"),
            transcript: row.get("transcript"),
            error: row.get("error"),
            transcribe_seconds: row.get("transcribe_seconds"),
            created_at: DateTime::parse_from_rfc3339(row.get("created_at"))?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(row.get("updated_at"))?.with_timezone(&Utc),
            started_at: row
                .get::<Option<String>, _>("started_at")
                .map(|t| DateTime::parse_from_rfc3339(&t))
                .transpose()?
                .map(|t| t.with_timezone(&Utc)),
            completed_at: row
                .get::<Option<String>, _>("completed_at")
                .map(|t| DateTime::parse_from_rfc3339(&t))
                .transpose()?
                .map(|t| t.with_timezone(&Utc)),
        })
    }
}

#[async_trait]
impl TaskStorage for SqliteTaskStorage {
    async fn create(&self, model: &TaskModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks
            (id, source_filename, audio_path, status, language, transcript, error,
             transcribe_seconds, created_at, updated_at, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&model.id)
        .bind(&model.source_filename)
        .bind(&model.audio_path)
        .bind(&model.status)
        .bind(&model.language)
        .bind(&model.transcript)
        .bind(&model.error)
        .bind(model.transcribe_seconds)
        .bind(model.created_at.to_rfc3339())
        .bind(model.updated_at.to_rfc3339())
        .bind(model.started_at.map(|t| t.to_rfc3339()))
        .bind(model.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<TaskModel>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(self.row_to_model(row)?),
            None => None,
        })
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<TaskModel>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut models = Vec::new();
        for row in rows {
            models.push(self.row_to_model(row)?);
        }
        Ok(models)
    }

    async fn get_queued(&self) -> Result<Vec<TaskModel>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE status = 'queued' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut models = Vec::new();
        for row in rows {
            models.push(self.row_to_model(row)?);
        }
        Ok(models)
    }

    async fn mark_processing(&self, task_id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'processing', updated_at = ?, started_at = ?
            WHERE id = ? AND status = 'queued'
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn store_transcript(&self, task_id: &str, transcript: &str, seconds: f64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'done', transcript = ?, transcribe_seconds = ?,
                error = NULL, updated_at = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(transcript)
        .bind(seconds)
        .bind(&now)
        .bind(&now)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn store_error(&self, task_id: &str, error: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'error', error = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(&now)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn requeue(&self, task_id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'queued', transcript = NULL, error = NULL,
                transcribe_seconds = NULL, started_at = NULL, completed_at = NULL,
                updated_at = ?
            WHERE id = ? AND status = 'error'
            "#,
        )
        .bind(&now)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_by_status(&self, status: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM tasks WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("cnt");
        Ok(count as u64)
    }
}
