//! Team statistics lookup
//!
//! Providers are external collaborators and are allowed to fail. The
//! resolver bounds every lookup with a timeout and falls back to league
//! averages, so an analysis never fails because stats were unavailable.

pub mod ratings;

pub use ratings::StaticRatings;

use crate::error::{BotError, Result};
use crate::model::TeamPair;
use crate::types::{ScoringProfile, Sport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of team scoring profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// `Ok(None)` when the provider does not know the team
    async fn lookup(&self, team_name: &str) -> Result<Option<ScoringProfile>>;
}

/// Resolves team names to profiles, never failing
#[derive(Clone)]
pub struct ProfileResolver {
    football: Option<Arc<dyn StatsProvider>>,
    basketball: Option<Arc<dyn StatsProvider>>,
    timeout: Duration,
}

impl ProfileResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            football: None,
            basketball: None,
            timeout,
        }
    }

    pub fn with_provider(mut self, sport: Sport, provider: Arc<dyn StatsProvider>) -> Self {
        match sport {
            Sport::Football => self.football = Some(provider),
            Sport::Basketball => self.basketball = Some(provider),
        }
        self
    }

    fn provider(&self, sport: Sport) -> Option<&Arc<dyn StatsProvider>> {
        match sport {
            Sport::Football => self.football.as_ref(),
            Sport::Basketball => self.basketball.as_ref(),
        }
    }

    /// Profile for `team_name`, or the league average when the provider is
    /// missing, does not know the team, errors, or times out.
    pub async fn resolve(&self, sport: Sport, team_name: &str) -> ScoringProfile {
        let Some(provider) = self.provider(sport) else {
            return ScoringProfile::league_average(team_name, sport);
        };

        let outcome = match tokio::time::timeout(self.timeout, provider.lookup(team_name)).await {
            Ok(result) => result,
            Err(_) => Err(BotError::Timeout(format!(
                "{} stats lookup for {} after {:?}",
                sport, team_name, self.timeout
            ))),
        };

        match outcome {
            Ok(Some(profile)) if profile.sport() == sport => profile,
            Ok(Some(profile)) => {
                tracing::warn!(
                    "Provider returned {} profile for {} team {}, using league average",
                    profile.sport(),
                    sport,
                    team_name
                );
                ScoringProfile::league_average(team_name, sport)
            }
            Ok(None) => {
                tracing::debug!("No {} stats for {}, using league average", sport, team_name);
                ScoringProfile::league_average(team_name, sport)
            }
            Err(e) => {
                let err = match e {
                    BotError::Provider(_) => e,
                    other => BotError::Provider(other.to_string()),
                };
                tracing::warn!("{}; using league average for {}", err, team_name);
                ScoringProfile::league_average(team_name, sport)
            }
        }
    }

    /// Both sides of a query, looked up concurrently
    pub async fn resolve_pair(
        &self,
        sport: Sport,
        pair: &TeamPair,
    ) -> (ScoringProfile, ScoringProfile) {
        tokio::join!(
            self.resolve(sport, &pair.home),
            self.resolve(sport, &pair.away)
        )
    }
}
