//! Exactly-once application of payment confirmations
//!
//! Delivery is at-least-once. The `pending -> confirmed` transition and the
//! credit/VIP write commit together, so only one delivery per reference ever
//! applies a benefit, and a failed write leaves the record pending for the
//! next delivery.

use super::{Benefit, PaymentStore};
use crate::error::{BotError, Result};
use crate::types::{PaymentKind, PaymentStatus, UserId};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of one confirmation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Benefit applied by this call
    Applied {
        user_id: UserId,
        kind: PaymentKind,
        credits: i64,
    },
    /// Another delivery got there first
    AlreadyConfirmed,
    /// Not approved yet; record stays pending
    StillPending,
    /// No payment recorded for the reference (possibly not written yet)
    UnknownReference,
}

pub struct PaymentReconciler {
    payments: Arc<dyn PaymentStore>,
    vip_days: i64,
}

impl PaymentReconciler {
    pub fn new(payments: Arc<dyn PaymentStore>, vip_days: i64) -> Self {
        Self { payments, vip_days }
    }

    pub async fn confirm(&self, reference: &str, approved: bool) -> Result<Confirmation> {
        let Some(record) = self.payments.find_by_reference(reference).await? else {
            let mismatch = BotError::PaymentMismatch(reference.to_string());
            warn!("{}", mismatch);
            return Ok(Confirmation::UnknownReference);
        };

        if record.status == PaymentStatus::Confirmed {
            info!("Payment {} already confirmed, ignoring redelivery", reference);
            return Ok(Confirmation::AlreadyConfirmed);
        }

        if !approved {
            return Ok(Confirmation::StillPending);
        }

        let benefit = match record.kind {
            PaymentKind::Vip => Benefit::Vip {
                days: self.vip_days,
            },
            PaymentKind::Credits => Benefit::Credits(record.credits),
        };

        match self.payments.confirm_and_apply(reference, &benefit).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Payment {} confirmed concurrently, ignoring", reference);
                return Ok(Confirmation::AlreadyConfirmed);
            }
            Err(e) => {
                error!("Applying payment {} failed, left pending: {}", reference, e);
                return Err(e);
            }
        }

        info!(
            "Payment {} confirmed: {} for user {}",
            reference,
            record.kind.as_str(),
            record.user_id
        );
        Ok(Confirmation::Applied {
            user_id: record.user_id,
            kind: record.kind,
            credits: record.credits,
        })
    }
}
