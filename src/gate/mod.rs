//! Request gate: one analysis request from query text to charged result
//!
//! Order matters. The forecast is computed before the ledger is touched, so
//! a failed computation never costs a credit and a denied debit never
//! delivers a result.


use crate::error::{BotError, Result};
use crate::ledger::Ledger;
use crate::model::{format_forecast, parse_query, Forecast, ProbabilityEngine};
use crate::stats::ProfileResolver;
use crate::types::{AnalysisRecord, Sport, UserId};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Append-only record of delivered analyses
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisLog: Send + Sync {
    async fn append(&self, record: &AnalysisRecord) -> Result<()>;
}

/// A delivered analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub forecast: Forecast,
    /// Formatted for the chat transport
    pub text: String,
}

pub struct RequestGate {
    ledger: Arc<dyn Ledger>,
    analyses: Arc<dyn AnalysisLog>,
    resolver: ProfileResolver,
    engine: ProbabilityEngine,
    cost: i64,
}

impl RequestGate {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        analyses: Arc<dyn AnalysisLog>,
        resolver: ProfileResolver,
        engine: ProbabilityEngine,
        cost: i64,
    ) -> Self {
        Self {
            ledger,
            analyses,
            resolver,
            engine,
            cost,
        }
    }

    /// Parse, resolve and forecast without touching the ledger
    pub async fn forecast(&self, sport: Sport, query: &str) -> Result<Forecast> {
        let pair = parse_query(query)?;
        let (home, away) = self.resolver.resolve_pair(sport, &pair).await;
        self.engine.forecast(sport, &home, &away)
    }

    /// Full request: forecast, then charge, then record.
    ///
    /// Returns `BotError::Input` for malformed queries and
    /// `BotError::InsufficientCredits` when the debit is denied.
    pub async fn analyze(&self, user_id: UserId, sport: Sport, query: &str) -> Result<AnalysisReport> {
        let forecast = self.forecast(sport, query).await?;
        let text = format_forecast(&forecast);

        if !self.ledger.try_debit(user_id, self.cost).await?.is_allowed() {
            debug!("User {} denied a {} analysis", user_id, sport);
            return Err(BotError::InsufficientCredits(user_id));
        }

        let record = AnalysisRecord {
            user_id,
            sport,
            query: query.trim().to_string(),
            result: text.clone(),
            created_at: Utc::now(),
        };
        // already charged; losing the log entry must not lose the result
        if let Err(e) = self.analyses.append(&record).await {
            error!("Failed to record analysis for user {}: {}", user_id, e);
        }

        info!("Delivered {} analysis to user {}", sport, user_id);
        Ok(AnalysisReport { forecast, text })
    }
}
