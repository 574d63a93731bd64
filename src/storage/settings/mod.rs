use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::config::{ProcessingMode, Settings};

#[async_trait]
pub trait SettingsStorage: Send + Sync + 'static {
    async fn load(&self) -> Result<Settings>;
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// Single-row settings table, seeded on first start.
pub struct SqliteSettingsStorage {
    pool: SqlitePool,
}

impl SqliteSettingsStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        info!("Initializing SQLite settings storage at {}", database_url);
        let pool = sqlx::SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                api_key TEXT NOT NULL,
                language TEXT NOT NULL,
                mode TEXT NOT NULL,
                hour_from INTEGER NOT NULL,
                hour_to INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let seed = Settings::seed_from_env();
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO settings (id, api_key, language, mode, hour_from, hour_to)
            VALUES (1, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&seed.api_key)
        .bind(&seed.language)
        .bind(seed.mode.to_string())
        .bind(seed.hour_from as i64)
        .bind(seed.hour_to as i64)
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SettingsStorage for SqliteSettingsStorage {
    async fn load(&self) -> Result<Settings> {
        let row = sqlx::query("SELECT * FROM settings WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        let mode: String = row.get("mode");
        Ok(Settings {
            api_key: row.get("api_key"),
            language: row.get("language"),
            mode: ProcessingMode::try_from(mode)
                .map_err(|e| anyhow::anyhow!(e))?,
            hour_from: row.get::<i64, _>("hour_from") as u8,
            hour_to: row.get::<i64, _>("hour_to") as u8,
        })
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE settings
            SET api_key = ?, language = ?, mode = ?, hour_from = ?, hour_to = ?
            WHERE id = 1
            "#,
        )
        .bind(&settings.api_key)
        .bind(&settings.language)
        .bind(settings.mode.to_string())
        .bind(settings.hour_from as i64)
        .bind(settings.hour_to as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
