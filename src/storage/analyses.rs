use super::{from_millis, Database};
use crate::error::{BotError, Result};
use crate::gate::AnalysisLog;
use crate::types::{AnalysisRecord, UserId};
use async_trait::async_trait;
use sqlx::Row;

impl Database {
    /// Most recent analyses for a user, newest first
    pub async fn recent_analyses(&self, user_id: UserId, limit: i64) -> Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, sport, query, result, created_at
            FROM analyses
            WHERE user_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let sport: String = row.get("sport");
                Ok(AnalysisRecord {
                    user_id: row.get("user_id"),
                    sport: sport.parse().map_err(BotError::Internal)?,
                    query: row.get("query"),
                    result: row.get("result"),
                    created_at: from_millis(row.get("created_at")),
                })
            })
            .collect()
    }

    pub async fn count_analyses(&self, user_id: UserId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM analyses WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

#[async_trait]
impl AnalysisLog for Database {
    async fn append(&self, record: &AnalysisRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analyses (user_id, sport, query, result, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(record.user_id)
        .bind(record.sport.as_str())
        .bind(&record.query)
        .bind(&record.result)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
