//! Mercado Pago API client
//!
//! Creates checkout preferences and fetches payment details for webhook
//! reconciliation.

use crate::config::PaymentsConfig;
use crate::error::{BotError, Result};
use crate::payments::{CheckoutPreference, CheckoutRequest, PaymentDetails, PaymentProcessor};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Clone)]
pub struct MercadoPagoClient {
    http: Client,
    base_url: String,
    access_token: String,
    notification_url: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(config: &PaymentsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            notification_url: config.notification_url.clone(),
        })
    }

    fn preference_body(&self, request: &CheckoutRequest) -> Result<Value> {
        let unit_price = request.unit_price.to_f64().ok_or_else(|| {
            BotError::Payment(format!("price {} is not representable", request.unit_price))
        })?;

        let mut body = json!({
            "items": [{
                "title": request.title,
                "quantity": 1,
                "currency_id": "BRL",
                "unit_price": unit_price,
            }],
            "payer": { "email": format!("user-{}@goalguru.local", request.user_id) },
            "external_reference": request.external_reference,
        });
        if let Some(url) = &self.notification_url {
            body["notification_url"] = json!(url);
        }
        Ok(body)
    }
}

#[async_trait]
impl PaymentProcessor for MercadoPagoClient {
    async fn create_preference(&self, request: &CheckoutRequest) -> Result<CheckoutPreference> {
        let url = format!("{}/checkout/preferences", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&self.preference_body(request)?)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(BotError::Payment(format!(
                "preference creation failed ({}): {}",
                status, text
            )));
        }

        let preference: CheckoutPreference = resp.json().await?;
        debug!(
            "Created preference {} for {}",
            preference.id, request.external_reference
        );
        Ok(preference)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::Payment(format!(
                "payment {} lookup returned {}",
                payment_id,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client(notification_url: Option<&str>) -> MercadoPagoClient {
        let config = PaymentsConfig {
            api_base: "https://api.mercadopago.com/".to_string(),
            access_token: "TEST-token".to_string(),
            notification_url: notification_url.map(String::from),
            webhook_secret: None,
            vip_price: dec!(29.90),
            credit_packs: vec![],
            timeout_ms: 1000,
        };
        MercadoPagoClient::new(&config).unwrap()
    }

    #[test]
    fn test_preference_body_shape() {
        let request = CheckoutRequest {
            user_id: 42,
            title: "VIP - 30 days".to_string(),
            unit_price: dec!(29.90),
            external_reference: "vip-42-1700000000000".to_string(),
        };
        let body = client(Some("https://bot.example/webhooks/payments"))
            .preference_body(&request)
            .unwrap();

        assert_eq!(body["items"][0]["unit_price"], json!(29.9));
        assert_eq!(body["items"][0]["currency_id"], "BRL");
        assert_eq!(body["external_reference"], "vip-42-1700000000000");
        assert_eq!(body["notification_url"], "https://bot.example/webhooks/payments");
        assert_eq!(body["payer"]["email"], "user-42@goalguru.local");
    }

    #[test]
    fn test_preference_body_without_notification_url() {
        let request = CheckoutRequest {
            user_id: 7,
            title: "5 credits".to_string(),
            unit_price: dec!(4.90),
            external_reference: "credits-7-1".to_string(),
        };
        let body = client(None).preference_body(&request).unwrap();
        assert!(body.get("notification_url").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client(None).base_url, "https://api.mercadopago.com");
    }

    #[test]
    fn test_payment_details_parse() {
        let details: PaymentDetails = serde_json::from_value(json!({
            "id": 123456,
            "status": "approved",
            "external_reference": "credits-7-1",
            "transaction_amount": 4.9
        }))
        .unwrap();
        assert!(details.is_approved());
        assert_eq!(details.external_reference.as_deref(), Some("credits-7-1"));
    }
}
