//! HTTP surface
//!
//! Health check, Telegram and payment webhooks, and the admin stats
//! endpoint. Webhooks always answer 200 so the sender never retries on our
//! internal failures; idempotency lives in the reconciler, not here.


use crate::error::{BotError, Result};
use crate::payments::{PaymentNotification, PaymentWebhookHandler, WebhookOutcome};
use crate::storage::{DashboardStats, Database};
use crate::telegram::{TelegramBot, Update};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared state for all handlers
pub struct AppState {
    pub db: Arc<Database>,
    pub telegram: Option<Arc<TelegramBot>>,
    pub payments: Option<Arc<PaymentWebhookHandler>>,
    /// `/admin/stats` rejects every request when unset
    pub admin_token: Option<String>,
}

async fn health_check() -> &'static str {
    "OK"
}

async fn telegram_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Discarding malformed Telegram update: {}", e);
            return StatusCode::OK;
        }
    };

    match &state.telegram {
        Some(telegram) => {
            let telegram = telegram.clone();
            tokio::spawn(async move { telegram.handle_update(update).await });
        }
        None => warn!("Telegram update {} received but Telegram is not configured", update.update_id),
    }
    StatusCode::OK
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let ack = (StatusCode::OK, Json(json!({ "received": true })));

    let notification: PaymentNotification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(e) => {
            warn!("Discarding malformed payment notification: {}", e);
            return ack;
        }
    };

    let Some(handler) = &state.payments else {
        warn!("Payment notification received but payments are not configured");
        return ack;
    };

    let outcome = handler
        .handle(
            &notification,
            header(&headers, "x-signature"),
            header(&headers, "x-request-id"),
        )
        .await;

    match outcome {
        Ok(WebhookOutcome::Reconciled(confirmation)) => {
            info!("Payment notification reconciled: {:?}", confirmation)
        }
        Ok(other) => debug!("Payment notification handled: {:?}", other),
        Err(e @ BotError::Signature(_)) => warn!("Rejected payment notification: {}", e),
        Err(e) => error!("Payment notification failed: {}", e),
    }
    ack
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn authorized(expected: Option<&str>, headers: &HeaderMap, query: &TokenQuery) -> bool {
    let Some(expected) = expected.filter(|t| !t.is_empty()) else {
        return false;
    };
    let bearer = header(headers, "authorization").and_then(|v| v.strip_prefix("Bearer "));
    bearer == Some(expected) || query.token.as_deref() == Some(expected)
}

async fn admin_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> std::result::Result<Json<DashboardStats>, StatusCode> {
    if !authorized(state.admin_token.as_deref(), &headers, &query) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    state.db.dashboard_stats().await.map(Json).map_err(|e| {
        error!("Failed to load dashboard stats: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/webhooks/telegram", post(telegram_webhook))
        .route("/webhooks/payments", post(payment_webhook))
        .route("/admin/stats", get(admin_stats))
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| BotError::Internal(format!("cannot bind {}: {}", bind, e)))?;
    info!("HTTP server listening on http://{}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| BotError::Internal(format!("server error: {}", e)))
}
