//! Checkout: pending record first, then the processor preference

use super::{CheckoutRequest, PaymentProcessor, PaymentStore};
use crate::config::PaymentsConfig;
use crate::error::{BotError, Result};
use crate::types::{PaymentKind, PaymentRecord, UserId};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// What the user is buying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Vip,
    /// One of the configured credit packs, by credit count
    Credits { credits: i64 },
}

/// Where to send the user to pay
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLink {
    pub url: String,
    pub reference: String,
}

pub struct CheckoutService {
    processor: Arc<dyn PaymentProcessor>,
    payments: Arc<dyn PaymentStore>,
    config: PaymentsConfig,
    vip_days: i64,
}

impl CheckoutService {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        payments: Arc<dyn PaymentStore>,
        config: PaymentsConfig,
        vip_days: i64,
    ) -> Self {
        Self {
            processor,
            payments,
            config,
            vip_days,
        }
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.config
    }

    pub async fn start(&self, user_id: UserId, purchase: Purchase) -> Result<CheckoutLink> {
        let (record, title) = match purchase {
            Purchase::Vip => (
                PaymentRecord::pending(user_id, PaymentKind::Vip, self.config.vip_price, 0, Utc::now()),
                format!("GoalGuru VIP - {} days", self.vip_days),
            ),
            Purchase::Credits { credits } => {
                let pack = self.config.pack(credits).ok_or_else(|| {
                    BotError::Payment(format!("no credit pack with {} credits", credits))
                })?;
                (
                    PaymentRecord::pending(
                        user_id,
                        PaymentKind::Credits,
                        pack.price,
                        pack.credits,
                        Utc::now(),
                    ),
                    format!("GoalGuru - {} credits", pack.credits),
                )
            }
        };

        // the record must exist before the user can possibly pay
        self.payments.record_pending(&record).await?;

        let preference = self
            .processor
            .create_preference(&CheckoutRequest {
                user_id,
                title,
                unit_price: record.amount,
                external_reference: record.external_reference.clone(),
            })
            .await?;

        info!(
            "Checkout {} started for user {} ({} BRL)",
            record.external_reference, user_id, record.amount
        );

        Ok(CheckoutLink {
            url: preference.init_point,
            reference: record.external_reference,
        })
    }
}
