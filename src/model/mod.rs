//! Probability models for match analysis
//!
//! Pure computation: two scoring profiles in, an outcome or totals
//! distribution out. No I/O happens here; missing team data is the
//! caller's problem (see `stats`).

pub mod basketball;
pub mod football;
pub mod query;
pub mod report;

pub use basketball::{normal_cdf, BasketballForecast, GaussianTotalsModel};
pub use football::{poisson, FootballForecast, PoissonModel, ScorelineGrid};
pub use query::{parse_query, TeamPair};
pub use report::format_forecast;

use crate::config::EngineConfig;
use crate::error::{BotError, Result};
use crate::types::{ScoringProfile, Sport};

/// A model that turns two team profiles into a forecast
pub trait ProbabilityModel: Send + Sync {
    type Output;

    /// Forecast a match between `home` and `away`
    fn forecast(&self, home: &ScoringProfile, away: &ScoringProfile) -> Result<Self::Output>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Result of either sport's model
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Football(FootballForecast),
    Basketball(BasketballForecast),
}

impl Forecast {
    pub fn sport(&self) -> Sport {
        match self {
            Forecast::Football(_) => Sport::Football,
            Forecast::Basketball(_) => Sport::Basketball,
        }
    }
}

/// Dispatches to the model for the requested sport
#[derive(Debug, Clone)]
pub struct ProbabilityEngine {
    football: PoissonModel,
    basketball: GaussianTotalsModel,
}

impl ProbabilityEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            football: PoissonModel::new(config.max_goals, config.over_lines.clone()),
            basketball: GaussianTotalsModel::new(
                config.basketball_sd,
                config.basketball_thresholds.clone(),
            ),
        }
    }

    pub fn forecast(
        &self,
        sport: Sport,
        home: &ScoringProfile,
        away: &ScoringProfile,
    ) -> Result<Forecast> {
        for profile in [home, away] {
            if profile.sport() != sport {
                return Err(BotError::Internal(format!(
                    "{} profile for {} used in a {} forecast",
                    profile.sport(),
                    profile.team_name,
                    sport
                )));
            }
        }

        let forecast = match sport {
            Sport::Football => Forecast::Football(self.football.forecast(home, away)?),
            Sport::Basketball => Forecast::Basketball(self.basketball.forecast(home, away)?),
        };

        tracing::debug!(
            "{} forecast computed: {} x {}",
            sport,
            home.team_name,
            away.team_name
        );
        Ok(forecast)
    }
}

impl Default for ProbabilityEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
