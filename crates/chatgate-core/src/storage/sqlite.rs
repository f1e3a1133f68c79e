//! SQLite storage backend
//!
//! # Usage
//!
//! ```no_run
//! use chatgate_core::SqliteStorage;
//!
//! # async fn example() -> chatgate_core::Result<()> {
//! // Default location: ~/.chatgate/chatgate.db
//! let storage = SqliteStorage::new(SqliteStorage::default_path()?).await?;
//! storage.health_check().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::keys::{KeyDirectory, KeyError, ResolvedCaller};
use crate::usage::{UsageRecord, UsageRecorder};
use async_trait::async_trait;
use chatgate_llm::util::mask_api_key;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// SQLite-backed usage log and key directory
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if missing) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if database creation or schema setup fails.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Internal(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Configuration(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to SQLite: {}", e)))?;

        let storage = Self { pool };
        storage.init_schema().await?;

        info!(path = %path.display(), "SQLite storage initialized");
        Ok(storage)
    }

    /// In-memory database (tests, `quota.backend = "memory"` setups)
    pub async fn in_memory() -> Result<Self> {
        // One connection: every pooled connection would otherwise see its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Database(format!("Failed to open in-memory SQLite: {}", e)))?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Default database path (`~/.chatgate/chatgate.db`)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Internal("Could not determine home directory".to_string()))?;
        Ok(home.join(".chatgate").join("chatgate.db"))
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                name TEXT,
                daily_limit INTEGER NOT NULL DEFAULT 10,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create api_keys table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                api_key TEXT NOT NULL,
                message TEXT NOT NULL,
                response TEXT NOT NULL,
                model TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create chat_logs table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_logs_api_key ON chat_logs(api_key, created_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to create index: {}", e)))?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<Duration> {
        let started = Instant::now();
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Health check failed: {}", e)))?;
        Ok(started.elapsed())
    }

    /// Insert or replace an API key. Keys are normally provisioned by the
    /// account service; this exists for seeding and tests.
    pub async fn upsert_api_key(
        &self,
        key: &str,
        name: Option<&str>,
        daily_limit: u64,
        active: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (key, name, daily_limit, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                name = excluded.name,
                daily_limit = excluded.daily_limit,
                is_active = excluded.is_active
            "#,
        )
        .bind(key)
        .bind(name)
        .bind(i64::try_from(daily_limit).unwrap_or(i64::MAX))
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent usage records for an identity, newest first
    pub async fn recent_usage(&self, identity: &str, limit: u32) -> Result<Vec<UsageRecord>> {
        let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT api_key, message, response, model, ip_address, created_at
            FROM chat_logs
            WHERE api_key = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(identity)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(identity, message, response, provider_used, source_address, created_at)| {
                    let timestamp = DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| Error::Internal(format!("Bad created_at: {}", e)))?
                        .with_timezone(&Utc);
                    Ok(UsageRecord {
                        identity,
                        timestamp,
                        message,
                        response,
                        provider_used,
                        source_address,
                    })
                },
            )
            .collect()
    }

    /// Total usage records
    pub async fn usage_count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl UsageRecorder for SqliteStorage {
    async fn record(&self, record: &UsageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_logs (api_key, message, response, model, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.identity)
        .bind(&record.message)
        .bind(&record.response)
        .bind(&record.provider_used)
        .bind(&record.source_address)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to insert chat log: {}", e)))?;

        debug!(
            caller = %mask_api_key(&record.identity),
            provider = %record.provider_used,
            "Usage recorded"
        );
        Ok(())
    }
}

#[async_trait]
impl KeyDirectory for SqliteStorage {
    async fn resolve(&self, raw: &str) -> std::result::Result<ResolvedCaller, KeyError> {
        let row: Option<(String, Option<String>, i64)> = sqlx::query_as(
            "SELECT key, name, daily_limit FROM api_keys WHERE key = ? AND is_active = 1",
        )
        .bind(raw)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KeyError::Unavailable(e.to_string()))?;

        match row {
            Some((identity, name, daily_limit)) => Ok(ResolvedCaller {
                identity,
                name,
                daily_limit: daily_limit.max(0) as u64,
            }),
            None => Err(KeyError::Invalid),
        }
    }
}
