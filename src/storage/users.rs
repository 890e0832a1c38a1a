//! Ledger backed by the `users` table

use super::{from_millis, Database};
use crate::error::{BotError, Result};
use crate::ledger::{Debit, Ledger};
use crate::types::{User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};
use tracing::debug;

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("user_id"),
        credits: row.get("credits"),
        vip: row.get("vip"),
        vip_expires_at: row.get::<Option<i64>, _>("vip_expires_at").map(from_millis),
        created_at: from_millis(row.get("created_at")),
    }
}

/// Upsert that adds `amount` credits, creating the user with `initial_credits` first
pub(super) async fn upsert_credits<'e, E>(
    executor: E,
    initial_credits: i64,
    user_id: UserId,
    amount: i64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    if amount < 0 {
        return Err(BotError::Internal(format!("negative credit grant {}", amount)));
    }

    sqlx::query(
        r#"
        INSERT INTO users (user_id, credits, vip, vip_expires_at, created_at)
        VALUES (?1, ?2 + ?3, 0, NULL, ?4)
        ON CONFLICT(user_id) DO UPDATE SET credits = users.credits + ?3
        "#,
    )
    .bind(user_id)
    .bind(initial_credits)
    .bind(amount)
    .bind(Utc::now().timestamp_millis())
    .execute(executor)
    .await?;

    debug!("Added {} credits to user {}", amount, user_id);
    Ok(())
}

/// Upsert that sets VIP until `now + duration_days`; remaining time is not carried over
pub(super) async fn upsert_vip<'e, E>(
    executor: E,
    initial_credits: i64,
    user_id: UserId,
    duration_days: i64,
) -> Result<DateTime<Utc>>
where
    E: Executor<'e, Database = Sqlite>,
{
    if duration_days <= 0 {
        return Err(BotError::Internal(format!(
            "VIP duration must be positive, got {}",
            duration_days
        )));
    }

    let now = Utc::now();
    let expires_at = now + Duration::days(duration_days);

    sqlx::query(
        r#"
        INSERT INTO users (user_id, credits, vip, vip_expires_at, created_at)
        VALUES (?1, ?2, 1, ?3, ?4)
        ON CONFLICT(user_id) DO UPDATE SET vip = 1, vip_expires_at = ?3
        "#,
    )
    .bind(user_id)
    .bind(initial_credits)
    .bind(expires_at.timestamp_millis())
    .bind(now.timestamp_millis())
    .execute(executor)
    .await?;

    debug!("User {} is VIP until {}", user_id, expires_at);
    Ok(from_millis(expires_at.timestamp_millis()))
}

impl Database {
    async fn ensure_user(&self, user_id: UserId, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, credits, vip, vip_expires_at, created_at)
            VALUES (?1, ?2, 0, NULL, ?3)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(self.initial_credits)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, credits, vip, vip_expires_at, created_at FROM users WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }
}

#[async_trait]
impl Ledger for Database {
    async fn get_or_create(&self, user_id: UserId) -> Result<User> {
        self.ensure_user(user_id, Utc::now()).await?;
        self.find_user(user_id)
            .await?
            .ok_or_else(|| BotError::Internal(format!("user {} vanished after insert", user_id)))
    }

    async fn try_debit(&self, user_id: UserId, amount: i64) -> Result<Debit> {
        if amount < 0 {
            return Err(BotError::Internal(format!("negative debit {}", amount)));
        }

        let now = Utc::now();
        self.ensure_user(user_id, now).await?;

        // single conditional update: the floor check and the decrement cannot interleave
        let result = sqlx::query(
            r#"
            UPDATE users
            SET credits = CASE
                WHEN vip = 1 AND vip_expires_at > ?3 THEN credits
                ELSE credits - ?2
            END
            WHERE user_id = ?1
              AND ((vip = 1 AND vip_expires_at > ?3) OR credits >= ?2)
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let outcome = if result.rows_affected() == 1 {
            Debit::Allowed
        } else {
            Debit::Denied
        };
        debug!("Debit of {} for user {}: {:?}", amount, user_id, outcome);
        Ok(outcome)
    }

    async fn add_credits(&self, user_id: UserId, amount: i64) -> Result<()> {
        upsert_credits(&self.pool, self.initial_credits, user_id, amount).await
    }

    async fn grant_vip(&self, user_id: UserId, duration_days: i64) -> Result<DateTime<Utc>> {
        upsert_vip(&self.pool, self.initial_credits, user_id, duration_days).await
    }
}
