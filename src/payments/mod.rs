//! Payments: checkout, webhook intake and reconciliation
//!
//! ```text
//! CheckoutService ──record pending──▶ PaymentStore
//!        │                                 ▲
//!        └─create preference──▶ processor  │ pending → confirmed
//!                                  │       │ + credits / VIP, one transaction
//!   webhook ──▶ PaymentWebhookHandler ──▶ PaymentReconciler
//! ```

pub mod checkout;
pub mod reconciler;
pub mod signature;
pub mod webhook;
#[cfg(test)]
mod tests;

pub use checkout::{CheckoutLink, CheckoutService, Purchase};
pub use reconciler::{Confirmation, PaymentReconciler};
pub use signature::verify_signature;
pub use webhook::{PaymentNotification, PaymentWebhookHandler, WebhookOutcome};

use crate::error::Result;
use crate::types::{PaymentRecord, UserId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Persistence for payment records
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new pending record. References are unique.
    async fn record_pending(&self, payment: &PaymentRecord) -> Result<()>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>>;

    /// Move `pending -> confirmed` and apply `benefit` to the payer as one
    /// unit of work. Returns false when the record is missing or was already
    /// confirmed. On error nothing is written and the record stays pending.
    async fn confirm_and_apply(&self, reference: &str, benefit: &Benefit) -> Result<bool>;
}

/// Ledger effect of a confirmed payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benefit {
    Vip { days: i64 },
    Credits(i64),
}

/// What the checkout asks the processor for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub title: String,
    pub unit_price: Decimal,
    pub external_reference: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutPreference {
    pub id: String,
    pub init_point: String,
}

/// Result of the processor's payment detail lookup
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentDetails {
    pub status: String,
    pub external_reference: Option<String>,
}

impl PaymentDetails {
    pub fn is_approved(&self) -> bool {
        self.status == "approved"
    }
}

/// External payment processor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_preference(&self, request: &CheckoutRequest) -> Result<CheckoutPreference>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails>;
}
