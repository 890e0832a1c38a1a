//! End-to-end tests: chat events through the gate, ledger and payments

#[cfg(test)]
mod tests {
    use crate::bot::{ButtonAction, ChatBot};
    use crate::config::PaymentsConfig;
    use crate::gate::RequestGate;
    use crate::ledger::Ledger;
    use crate::model::{Forecast, ProbabilityEngine};
    use crate::payments::{
        CheckoutPreference, CheckoutService, MockPaymentProcessor, PaymentDetails,
        PaymentNotification, PaymentReconciler, PaymentWebhookHandler, WebhookOutcome,
    };
    use crate::stats::{ProfileResolver, StaticRatings};
    use crate::storage::Database;
    use crate::types::{ChatEvent, ScoringProfile, Sport, TeamRatings};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        db: Arc<Database>,
        bot: ChatBot,
        webhook: PaymentWebhookHandler,
        /// external reference of the last checkout, as the processor saw it
        last_reference: Arc<Mutex<Option<String>>>,
    }

    async fn harness(initial_credits: i64) -> Harness {
        let db = Arc::new(
            Database::in_memory()
                .await
                .unwrap()
                .with_initial_credits(initial_credits),
        );
        let last_reference = Arc::new(Mutex::new(None));

        let mut processor = MockPaymentProcessor::new();
        let seen = last_reference.clone();
        processor.expect_create_preference().returning(move |req| {
            *seen.lock() = Some(req.external_reference.clone());
            Ok(CheckoutPreference {
                id: "pref".to_string(),
                init_point: format!("https://mp.example/pay/{}", req.external_reference),
            })
        });
        let approved = last_reference.clone();
        processor.expect_fetch_payment().returning(move |_| {
            Ok(PaymentDetails {
                status: "approved".to_string(),
                external_reference: approved.lock().clone(),
            })
        });
        let processor = Arc::new(processor);

        let payments = PaymentsConfig {
            api_base: "https://api.mercadopago.com".to_string(),
            access_token: "TEST".to_string(),
            notification_url: None,
            webhook_secret: None,
            vip_price: dec!(29.90),
            credit_packs: vec![crate::config::CreditPack {
                credits: 15,
                price: dec!(12.90),
            }],
            timeout_ms: 1000,
        };

        let resolver = ProfileResolver::new(Duration::from_secs(1))
            .with_provider(Sport::Basketball, Arc::new(StaticRatings::new()));
        let gate = Arc::new(RequestGate::new(
            db.clone(),
            db.clone(),
            resolver,
            ProbabilityEngine::default(),
            1,
        ));
        let checkout = Arc::new(CheckoutService::new(
            processor.clone(),
            db.clone(),
            payments,
            30,
        ));
        let reconciler = Arc::new(PaymentReconciler::new(db.clone(), 30));
        let webhook =
            PaymentWebhookHandler::new(processor, reconciler, None, Duration::from_secs(1));

        Harness {
            bot: ChatBot::new(gate, db.clone(), Some(checkout), 30),
            db,
            webhook,
            last_reference,
        }
    }

    fn command(name: &str, args: &str) -> ChatEvent {
        ChatEvent::Command {
            name: name.to_string(),
            args: args.to_string(),
            user_id: 10,
            chat_id: 10,
        }
    }

    fn button(data: &str) -> ChatEvent {
        ChatEvent::Button {
            data: data.to_string(),
            user_id: 10,
            chat_id: 10,
        }
    }

    fn payment_notification() -> PaymentNotification {
        serde_json::from_value(serde_json::json!({"type": "payment", "data": {"id": 555}})).unwrap()
    }

    #[tokio::test]
    async fn test_credits_run_out_then_purchase_restores_access() {
        let h = harness(2).await;
        h.bot.handle(command("start", "")).await;

        for _ in 0..2 {
            let reply = h.bot.handle(command("futebol", "Flamengo x Palmeiras")).await;
            assert!(reply.text.contains("Flamengo"));
        }
        let denied = h.bot.handle(command("futebol", "Flamengo x Palmeiras")).await;
        assert!(denied.text.contains("Not enough credits"));
        assert_eq!(h.db.count_analyses(10).await.unwrap(), 2);

        let checkout = h.bot.handle(button("buy:credits:15")).await;
        assert!(matches!(checkout.buttons[0][0].action, ButtonAction::Url(_)));
        assert!(h.last_reference.lock().is_some());

        // processor delivers the notification twice
        for _ in 0..2 {
            h.webhook.handle(&payment_notification(), None, None).await.unwrap();
        }
        assert_eq!(h.db.get_or_create(10).await.unwrap().credits, 15);

        let reply = h.bot.handle(command("futebol", "Flamengo x Palmeiras")).await;
        assert!(reply.text.contains("Draw"));
        assert_eq!(h.db.get_or_create(10).await.unwrap().credits, 14);
    }

    #[tokio::test]
    async fn test_vip_purchase_makes_analyses_free() {
        let h = harness(0).await;

        h.bot.handle(button("buy:vip")).await;
        let outcome = h.webhook.handle(&payment_notification(), None, None).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Reconciled(_)));

        for _ in 0..3 {
            let reply = h.bot.handle(command("basquete", "Lakers x Celtics")).await;
            assert!(reply.text.contains("Expected total"));
        }
        let user = h.db.get_or_create(10).await.unwrap();
        assert_eq!(user.credits, 0);
        assert_eq!(h.db.count_analyses(10).await.unwrap(), 3);

        let balance = h.bot.handle(command("balance", "")).await;
        assert!(balance.text.contains("30 days left"));
    }

    #[tokio::test]
    async fn test_golden_scoreline_through_engine() {
        // for × against of 1.0 leaves the lambdas at 1.5 and 1.3
        let home = ScoringProfile::new(
            "Home",
            TeamRatings::Football {
                avg_goals_for: 1.5,
                avg_goals_against: 1.0,
            },
        );
        let away = ScoringProfile::new(
            "Away",
            TeamRatings::Football {
                avg_goals_for: 1.3,
                avg_goals_against: 1.0,
            },
        );

        let forecast = ProbabilityEngine::default()
            .forecast(Sport::Football, &home, &away)
            .unwrap();
        let Forecast::Football(f) = forecast else {
            panic!("expected football forecast");
        };

        assert!((f.home_win - 0.41793590163416755).abs() < 1e-9);
        assert!((f.draw - 0.2530573439961799).abs() < 1e-9);
        assert!((f.away_win - 0.32900675436965265).abs() < 1e-9);
        assert!((f.over(2.5).unwrap() - 0.5273908726484645).abs() < 1e-9);
        assert_eq!(f.most_likely_score, (1, 1));
    }
}
