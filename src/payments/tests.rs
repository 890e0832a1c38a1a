//! Tests for payments module

#[cfg(test)]
mod tests {
    use super::super::signature::sign;
    use super::super::*;
    use crate::config::{CreditPack, PaymentsConfig};
    use crate::error::BotError;
    use crate::ledger::Ledger;
    use crate::storage::Database;
    use crate::types::{PaymentKind, PaymentRecord, PaymentStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn payments_config() -> PaymentsConfig {
        PaymentsConfig {
            api_base: "https://api.mercadopago.com".to_string(),
            access_token: "TEST-token".to_string(),
            notification_url: None,
            webhook_secret: None,
            vip_price: dec!(29.90),
            credit_packs: vec![
                CreditPack { credits: 5, price: dec!(4.90) },
                CreditPack { credits: 15, price: dec!(12.90) },
            ],
            timeout_ms: 1000,
        }
    }

    async fn db() -> Arc<Database> {
        Arc::new(Database::in_memory().await.unwrap())
    }

    async fn seed(db: &Database, user_id: i64, kind: PaymentKind, credits: i64) -> String {
        let record = PaymentRecord::pending(user_id, kind, dec!(12.90), credits, Utc::now());
        db.record_pending(&record).await.unwrap();
        record.external_reference
    }

    fn reconciler(db: &Arc<Database>) -> PaymentReconciler {
        PaymentReconciler::new(db.clone(), 30)
    }

    // ---- Reconciler ----

    #[tokio::test]
    async fn test_confirm_credits_applies_once() {
        let db = db().await;
        let reference = seed(&db, 1, PaymentKind::Credits, 15).await;
        let reconciler = reconciler(&db);

        let first = reconciler.confirm(&reference, true).await.unwrap();
        assert_eq!(
            first,
            Confirmation::Applied {
                user_id: 1,
                kind: PaymentKind::Credits,
                credits: 15
            }
        );
        let second = reconciler.confirm(&reference, true).await.unwrap();
        assert_eq!(second, Confirmation::AlreadyConfirmed);

        assert_eq!(db.get_or_create(1).await.unwrap().credits, 20);
    }

    #[tokio::test]
    async fn test_confirm_vip_grants_thirty_days_once() {
        let db = db().await;
        let reference = seed(&db, 2, PaymentKind::Vip, 0).await;
        let reconciler = reconciler(&db);

        reconciler.confirm(&reference, true).await.unwrap();
        let expires = db.get_or_create(2).await.unwrap().vip_expires_at.unwrap();

        assert_eq!(
            reconciler.confirm(&reference, true).await.unwrap(),
            Confirmation::AlreadyConfirmed
        );
        let user = db.get_or_create(2).await.unwrap();
        assert!(user.is_vip_active(Utc::now()));
        assert_eq!(user.vip_expires_at, Some(expires));
        assert_eq!(user.vip_days_left(Utc::now()), 30);
    }

    #[tokio::test]
    async fn test_confirm_unknown_reference_is_noop() {
        let db = db().await;
        let outcome = reconciler(&db).confirm("credits-9-123", true).await.unwrap();

        assert_eq!(outcome, Confirmation::UnknownReference);
        assert_eq!(db.dashboard_stats().await.unwrap().total_users, 0);
    }

    #[tokio::test]
    async fn test_confirm_not_approved_stays_pending() {
        let db = db().await;
        let reference = seed(&db, 3, PaymentKind::Credits, 5).await;
        let reconciler = reconciler(&db);

        assert_eq!(
            reconciler.confirm(&reference, false).await.unwrap(),
            Confirmation::StillPending
        );
        let record = db.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);

        // a later approval still goes through
        assert!(matches!(
            reconciler.confirm(&reference, true).await.unwrap(),
            Confirmation::Applied { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_apply_once() {
        let db = db().await;
        let reference = seed(&db, 4, PaymentKind::Credits, 15).await;
        let reconciler = Arc::new(reconciler(&db));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let reconciler = reconciler.clone();
                let reference = reference.clone();
                tokio::spawn(async move { reconciler.confirm(&reference, true).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if let Confirmation::Applied { .. } = handle.await.unwrap().unwrap() {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(db.get_or_create(4).await.unwrap().credits, 20);
    }

    #[tokio::test]
    async fn test_failed_benefit_write_leaves_payment_pending() {
        let db = db().await;
        let reference = seed(&db, 5, PaymentKind::Credits, 5).await;

        for event in ["INSERT", "UPDATE"] {
            sqlx::query(&format!(
                "CREATE TRIGGER users_frozen_{0} BEFORE {0} ON users \
                 BEGIN SELECT RAISE(ABORT, 'users frozen'); END",
                event
            ))
            .execute(db.pool())
            .await
            .unwrap();
        }

        let reconciler = reconciler(&db);
        assert!(reconciler.confirm(&reference, true).await.is_err());
        let record = db.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);

        for event in ["INSERT", "UPDATE"] {
            sqlx::query(&format!("DROP TRIGGER users_frozen_{}", event))
                .execute(db.pool())
                .await
                .unwrap();
        }

        // redelivery applies the pack exactly once
        let outcome = reconciler.confirm(&reference, true).await.unwrap();
        assert!(matches!(outcome, Confirmation::Applied { credits: 5, .. }));
        assert_eq!(
            reconciler.confirm(&reference, true).await.unwrap(),
            Confirmation::AlreadyConfirmed
        );
        assert_eq!(db.get_or_create(5).await.unwrap().credits, 10);
    }

    #[tokio::test]
    async fn test_invalid_vip_duration_leaves_payment_pending() {
        let db = db().await;
        let reference = seed(&db, 8, PaymentKind::Vip, 0).await;

        let misconfigured = PaymentReconciler::new(db.clone(), 0);
        assert!(misconfigured.confirm(&reference, true).await.is_err());

        let record = db.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(db.find_user(8).await.unwrap().is_none());
    }

    // ---- Checkout ----

    #[tokio::test]
    async fn test_checkout_records_pending_and_returns_link() {
        let db = db().await;
        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_create_preference()
            .withf(|req| {
                req.user_id == 6
                    && req.unit_price == dec!(12.90)
                    && req.external_reference.starts_with("credits-6-")
                    && req.title.contains("15 credits")
            })
            .times(1)
            .returning(|_| {
                Ok(CheckoutPreference {
                    id: "pref-1".to_string(),
                    init_point: "https://mp.example/checkout/pref-1".to_string(),
                })
            });

        let checkout = CheckoutService::new(Arc::new(processor), db.clone(), payments_config(), 30);
        let link = checkout
            .start(6, Purchase::Credits { credits: 15 })
            .await
            .unwrap();

        assert_eq!(link.url, "https://mp.example/checkout/pref-1");
        let record = db.find_by_reference(&link.reference).await.unwrap().unwrap();
        assert_eq!(record.kind, PaymentKind::Credits);
        assert_eq!(record.credits, 15);
        assert_eq!(record.amount, dec!(12.90));
        assert_eq!(record.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_checkout_vip_uses_vip_price() {
        let db = db().await;
        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_create_preference()
            .withf(|req| req.unit_price == dec!(29.90) && req.external_reference.starts_with("vip-7-"))
            .returning(|_| {
                Ok(CheckoutPreference {
                    id: "pref-2".to_string(),
                    init_point: "https://mp.example/checkout/pref-2".to_string(),
                })
            });

        let checkout = CheckoutService::new(Arc::new(processor), db.clone(), payments_config(), 30);
        let link = checkout.start(7, Purchase::Vip).await.unwrap();

        let record = db.find_by_reference(&link.reference).await.unwrap().unwrap();
        assert_eq!(record.kind, PaymentKind::Vip);
        assert_eq!(record.credits, 0);
    }

    #[tokio::test]
    async fn test_checkout_unknown_pack_rejected() {
        let db = db().await;
        let mut processor = MockPaymentProcessor::new();
        processor.expect_create_preference().never();

        let checkout = CheckoutService::new(Arc::new(processor), db.clone(), payments_config(), 30);
        let err = checkout
            .start(8, Purchase::Credits { credits: 7 })
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Payment(_)));
        assert!(db.payments_for(8).await.unwrap().is_empty());
    }

    // ---- Signature ----

    #[test]
    fn test_signature_roundtrip() {
        let header = sign("secret", "123456", Some("req-1"), "1704908010");
        assert!(verify_signature("secret", &header, Some("req-1"), "123456").is_ok());
    }

    #[test]
    fn test_signature_rejects_wrong_secret_or_id() {
        let header = sign("secret", "123456", Some("req-1"), "1704908010");
        assert!(verify_signature("other", &header, Some("req-1"), "123456").is_err());
        assert!(verify_signature("secret", &header, Some("req-1"), "654321").is_err());
        assert!(verify_signature("secret", &header, Some("req-2"), "123456").is_err());
    }

    #[test]
    fn test_signature_malformed_header() {
        assert!(matches!(
            verify_signature("secret", "v1=abcd", None, "1"),
            Err(BotError::Signature(_))
        ));
        assert!(matches!(
            verify_signature("secret", "ts=1,v1=not-hex", None, "1"),
            Err(BotError::Signature(_))
        ));
    }

    #[test]
    fn test_signature_without_request_id() {
        let header = sign("secret", "42", None, "1");
        assert!(verify_signature("secret", &header, None, "42").is_ok());
    }

    // ---- Webhook ----

    fn notification(body: serde_json::Value) -> PaymentNotification {
        serde_json::from_value(body).unwrap()
    }

    fn approved(reference: &str) -> PaymentDetails {
        PaymentDetails {
            status: "approved".to_string(),
            external_reference: Some(reference.to_string()),
        }
    }

    fn handler(
        db: &Arc<Database>,
        processor: MockPaymentProcessor,
        secret: Option<&str>,
    ) -> PaymentWebhookHandler {
        PaymentWebhookHandler::new(
            Arc::new(processor),
            Arc::new(reconciler(db)),
            secret.map(String::from),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_notification_id_number_or_string() {
        let numeric = notification(serde_json::json!({"type": "payment", "data": {"id": 123}}));
        assert_eq!(numeric.payment_id().as_deref(), Some("123"));

        let text = notification(serde_json::json!({"type": "payment", "data": {"id": "456"}}));
        assert_eq!(text.payment_id().as_deref(), Some("456"));

        let empty = notification(serde_json::json!({"type": "payment"}));
        assert!(empty.payment_id().is_none());
    }

    #[tokio::test]
    async fn test_webhook_ignores_other_types() {
        let db = db().await;
        let mut processor = MockPaymentProcessor::new();
        processor.expect_fetch_payment().never();

        let outcome = handler(&db, processor, None)
            .handle(
                &notification(serde_json::json!({"type": "merchant_order", "data": {"id": 1}})),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_webhook_approved_confirms() {
        let db = db().await;
        let reference = seed(&db, 10, PaymentKind::Credits, 5).await;

        let mut processor = MockPaymentProcessor::new();
        let expected = reference.clone();
        processor
            .expect_fetch_payment()
            .withf(|id| id == "987")
            .times(2)
            .returning(move |_| Ok(approved(&expected)));

        let handler = handler(&db, processor, None);
        let body = notification(serde_json::json!({"type": "payment", "data": {"id": 987}}));

        let first = handler.handle(&body, None, None).await.unwrap();
        assert!(matches!(
            first,
            WebhookOutcome::Reconciled(Confirmation::Applied { credits: 5, .. })
        ));
        let second = handler.handle(&body, None, None).await.unwrap();
        assert_eq!(
            second,
            WebhookOutcome::Reconciled(Confirmation::AlreadyConfirmed)
        );
        assert_eq!(db.get_or_create(10).await.unwrap().credits, 10);
    }

    #[tokio::test]
    async fn test_webhook_not_approved() {
        let db = db().await;
        let reference = seed(&db, 11, PaymentKind::Vip, 0).await;

        let mut processor = MockPaymentProcessor::new();
        processor.expect_fetch_payment().returning(move |_| {
            Ok(PaymentDetails {
                status: "in_process".to_string(),
                external_reference: Some(reference.clone()),
            })
        });

        let outcome = handler(&db, processor, None)
            .handle(
                &notification(serde_json::json!({"type": "payment", "data": {"id": "5"}})),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::NotApproved {
                status: "in_process".to_string()
            }
        );
        assert!(!db.get_or_create(11).await.unwrap().vip);
    }

    #[tokio::test]
    async fn test_webhook_missing_reference() {
        let db = db().await;
        let mut processor = MockPaymentProcessor::new();
        processor.expect_fetch_payment().returning(|_| {
            Ok(PaymentDetails {
                status: "approved".to_string(),
                external_reference: None,
            })
        });

        let outcome = handler(&db, processor, None)
            .handle(
                &notification(serde_json::json!({"type": "payment", "data": {"id": 1}})),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::MissingReference);
    }

    #[tokio::test]
    async fn test_webhook_signature_enforced_when_configured() {
        let db = db().await;
        let reference = seed(&db, 12, PaymentKind::Credits, 5).await;

        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_fetch_payment()
            .times(1)
            .returning(move |_| Ok(approved(&reference)));

        let handler = handler(&db, processor, Some("whsec"));
        let body = notification(serde_json::json!({"type": "payment", "data": {"id": 77}}));

        let missing = handler.handle(&body, None, Some("req-9")).await;
        assert!(matches!(missing, Err(BotError::Signature(_))));

        let forged = sign("wrong", "77", Some("req-9"), "1");
        let rejected = handler.handle(&body, Some(&forged), Some("req-9")).await;
        assert!(matches!(rejected, Err(BotError::Signature(_))));

        let valid = sign("whsec", "77", Some("req-9"), "1");
        let outcome = handler.handle(&body, Some(&valid), Some("req-9")).await.unwrap();
        assert!(matches!(
            outcome,
            WebhookOutcome::Reconciled(Confirmation::Applied { .. })
        ));
    }

    struct SlowProcessor;

    #[async_trait::async_trait]
    impl PaymentProcessor for SlowProcessor {
        async fn create_preference(
            &self,
            _request: &CheckoutRequest,
        ) -> crate::error::Result<CheckoutPreference> {
            Err(BotError::Internal("unused".to_string()))
        }

        async fn fetch_payment(&self, _payment_id: &str) -> crate::error::Result<PaymentDetails> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(BotError::Internal("too late".to_string()))
        }
    }

    #[tokio::test]
    async fn test_webhook_fetch_times_out() {
        let db = db().await;
        let handler = PaymentWebhookHandler::new(
            Arc::new(SlowProcessor),
            Arc::new(reconciler(&db)),
            None,
            Duration::from_secs(2),
        );

        tokio::time::pause();
        let outcome = handler
            .handle(
                &notification(serde_json::json!({"type": "payment", "data": {"id": 1}})),
                None,
                None,
            )
            .await;
        assert!(matches!(outcome, Err(BotError::Timeout(_))));
    }
}
