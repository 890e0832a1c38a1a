//! Payment webhook intake
//!
//! A notification only carries the processor's payment id; status and
//! external reference come from a follow-up detail fetch.

use super::{verify_signature, Confirmation, PaymentProcessor, PaymentReconciler};
use crate::error::{BotError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Body posted by the processor: `{type, data: {id}}`
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationData {
    #[serde(default)]
    pub id: Value,
}

impl PaymentNotification {
    pub fn is_payment(&self) -> bool {
        self.kind.as_deref() == Some("payment")
    }

    /// Payment id, sent as either a number or a string
    pub fn payment_id(&self) -> Option<String> {
        match &self.data.as_ref()?.id {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a payment notification, or no usable id
    Ignored,
    /// Processor reports a non-approved status
    NotApproved { status: String },
    /// Approved but the processor returned no external reference
    MissingReference,
    Reconciled(Confirmation),
}

pub struct PaymentWebhookHandler {
    processor: Arc<dyn PaymentProcessor>,
    reconciler: Arc<PaymentReconciler>,
    webhook_secret: Option<String>,
    timeout: Duration,
}

impl PaymentWebhookHandler {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        reconciler: Arc<PaymentReconciler>,
        webhook_secret: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            processor,
            reconciler,
            webhook_secret,
            timeout,
        }
    }

    pub async fn handle(
        &self,
        notification: &PaymentNotification,
        signature: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<WebhookOutcome> {
        if !notification.is_payment() {
            debug!("Ignoring webhook of type {:?}", notification.kind);
            return Ok(WebhookOutcome::Ignored);
        }
        let Some(payment_id) = notification.payment_id() else {
            warn!("Payment webhook without a usable data.id");
            return Ok(WebhookOutcome::Ignored);
        };

        if let Some(secret) = &self.webhook_secret {
            let header = signature
                .ok_or_else(|| BotError::Signature("missing x-signature header".to_string()))?;
            verify_signature(secret, header, request_id, &payment_id)?;
        }

        let details = tokio::time::timeout(self.timeout, self.processor.fetch_payment(&payment_id))
            .await
            .map_err(|_| BotError::Timeout(format!("payment {} lookup", payment_id)))??;

        if !details.is_approved() {
            info!("Payment {} is {}, not confirming", payment_id, details.status);
            return Ok(WebhookOutcome::NotApproved {
                status: details.status,
            });
        }

        let Some(reference) = details.external_reference.filter(|r| !r.is_empty()) else {
            warn!("Approved payment {} has no external reference", payment_id);
            return Ok(WebhookOutcome::MissingReference);
        };

        let confirmation = self.reconciler.confirm(&reference, true).await?;
        Ok(WebhookOutcome::Reconciled(confirmation))
    }
}
