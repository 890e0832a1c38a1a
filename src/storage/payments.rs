use super::users::{upsert_credits, upsert_vip};
use super::{from_millis, Database};
use crate::error::{BotError, Result};
use crate::payments::{Benefit, PaymentStore};
use crate::types::{PaymentRecord, UserId};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

fn payment_from_row(row: &SqliteRow) -> Result<PaymentRecord> {
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    let amount: String = row.get("amount");

    Ok(PaymentRecord {
        user_id: row.get("user_id"),
        kind: kind.parse().map_err(BotError::Internal)?,
        amount: Decimal::from_str(&amount)
            .map_err(|e| BotError::Internal(format!("stored amount {:?}: {}", amount, e)))?,
        credits: row.get("credits"),
        external_reference: row.get("external_reference"),
        status: status.parse().map_err(BotError::Internal)?,
        created_at: from_millis(row.get("created_at")),
    })
}

impl Database {
    pub async fn payments_for(&self, user_id: UserId) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, kind, amount, credits, external_reference, status, created_at
            FROM payments
            WHERE user_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }
}

#[async_trait]
impl PaymentStore for Database {
    async fn record_pending(&self, payment: &PaymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (user_id, kind, amount, credits, external_reference, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.kind.as_str())
        .bind(payment.amount.to_string())
        .bind(payment.credits)
        .bind(&payment.external_reference)
        .bind(payment.status.as_str())
        .bind(payment.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, kind, amount, credits, external_reference, status, created_at
            FROM payments
            WHERE external_reference = ?1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    async fn confirm_and_apply(&self, reference: &str, benefit: &Benefit) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let user_id: Option<UserId> = sqlx::query_scalar(
            r#"
            UPDATE payments
            SET status = 'confirmed', confirmed_at = ?2
            WHERE external_reference = ?1 AND status = 'pending'
            RETURNING user_id
            "#,
        )
        .bind(reference)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        // an error here drops the transaction, which rolls the claim back
        match *benefit {
            Benefit::Vip { days } => {
                upsert_vip(&mut *tx, self.initial_credits, user_id, days).await?;
            }
            Benefit::Credits(credits) => {
                upsert_credits(&mut *tx, self.initial_credits, user_id, credits).await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }
}
