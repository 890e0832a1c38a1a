//! SQLite persistence
//!
//! One `Database` handle backs the ledger, the payment store and the
//! analysis log. Timestamps are stored as unix milliseconds and money as
//! decimal text.

mod analyses;
mod payments;
mod users;

use crate::config::DatabaseConfig;
use crate::error::{BotError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const DEFAULT_INITIAL_CREDITS: i64 = 5;

/// Counts shown on the admin endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_vips: i64,
    pub total_analyses: i64,
    pub confirmed_payments: i64,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    initial_credits: i64,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    BotError::Internal(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Opened database at {}", config.path);
        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests and offline CLI commands
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // every connection to :memory: is a separate database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            initial_credits: DEFAULT_INITIAL_CREDITS,
        })
    }

    /// Credits given to users created from now on
    pub fn with_initial_credits(mut self, credits: i64) -> Self {
        self.initial_credits = credits.max(0);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let now = Utc::now().timestamp_millis();
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE vip = 1 AND vip_expires_at > ?1) AS active_vips,
                (SELECT COUNT(*) FROM analyses) AS total_analyses,
                (SELECT COUNT(*) FROM payments WHERE status = 'confirmed') AS confirmed_payments
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users: row.get("total_users"),
            active_vips: row.get("active_vips"),
            total_analyses: row.get("total_analyses"),
            confirmed_payments: row.get("confirmed_payments"),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
