//! Entitlement ledger: credits and VIP status per user
//!
//! The ledger is the single owner of user balances. Every operation is a
//! single atomic update against the backing store, so concurrent requests
//! from the same user can never overspend.

use crate::error::Result;
use crate::types::{User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of a debit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debit {
    /// Charged, or free because the user is an active VIP
    Allowed,
    /// Not enough credits; nothing changed
    Denied,
}

impl Debit {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Debit::Allowed)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Existing user, or a new one with the default balance. Never
    /// overwrites an existing user.
    async fn get_or_create(&self, user_id: UserId) -> Result<User>;

    /// Take `amount` credits unless the user is an active VIP. Denied when
    /// credits would go negative.
    async fn try_debit(&self, user_id: UserId, amount: i64) -> Result<Debit>;

    async fn add_credits(&self, user_id: UserId, amount: i64) -> Result<()>;

    /// Set VIP until `now + duration_days`. A new grant replaces the
    /// previous expiry; remaining time is not carried over.
    async fn grant_vip(&self, user_id: UserId, duration_days: i64) -> Result<DateTime<Utc>>;
}
