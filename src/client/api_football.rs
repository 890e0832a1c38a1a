//! API-Football client for team statistics
//!
//! Resolves a team by name, then reads its season goal averages.

use crate::config::StatsConfig;
use crate::error::{BotError, Result};
use crate::stats::StatsProvider;
use crate::types::{ScoringProfile, TeamRatings};
use async_trait::async_trait;
use chrono::Datelike;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const LEAGUE_AVG_GOALS_FOR: f64 = 1.5;
const LEAGUE_AVG_GOALS_AGAINST: f64 = 1.2;

/// API-Football (api-sports.io) client
#[derive(Clone)]
pub struct ApiFootballClient {
    http: Client,
    base_url: String,
    api_key: String,
    season: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    #[serde(default)]
    response: Vec<TeamEntry>,
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    team: TeamInfo,
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    id: i64,
    name: String,
}

impl ApiFootballClient {
    pub fn new(config: &StatsConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.football_api_base.trim_end_matches('/').to_string(),
            api_key,
            season: config.season,
        })
    }

    fn season(&self) -> i32 {
        self.season.unwrap_or_else(|| chrono::Utc::now().year())
    }

    async fn find_team(&self, team_name: &str) -> Result<Option<TeamInfo>> {
        let url = format!("{}/teams", self.base_url);
        let resp = self
            .http
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(&[("name", team_name)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::Provider(format!(
                "team search for {} returned {}",
                team_name,
                resp.status()
            )));
        }

        let teams: TeamsResponse = resp.json().await?;
        Ok(teams.response.into_iter().next().map(|entry| entry.team))
    }

    async fn team_statistics(&self, team_id: i64) -> Result<Value> {
        let url = format!("{}/teams/statistics", self.base_url);
        let resp = self
            .http
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(&[
                ("team", team_id.to_string()),
                ("season", self.season().to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::Provider(format!(
                "statistics for team {} returned {}",
                team_id,
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        Ok(body["response"].clone())
    }
}

/// Read a goal average that may arrive as a number or a numeric string.
/// Zero, negative and missing values count as missing.
fn parse_average(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed > 0.0).then_some(parsed)
}

/// Build a profile from a `/teams/statistics` response body
pub(crate) fn profile_from_statistics(team_name: &str, stats: &Value) -> ScoringProfile {
    let goals = &stats["goals"];
    let goals_for = parse_average(&goals["for"]["average"]["total"]).unwrap_or(LEAGUE_AVG_GOALS_FOR);
    let goals_against =
        parse_average(&goals["against"]["average"]["total"]).unwrap_or(LEAGUE_AVG_GOALS_AGAINST);

    ScoringProfile::new(
        team_name,
        TeamRatings::Football {
            avg_goals_for: goals_for,
            avg_goals_against: goals_against,
        },
    )
}

#[async_trait]
impl StatsProvider for ApiFootballClient {
    async fn lookup(&self, team_name: &str) -> Result<Option<ScoringProfile>> {
        let Some(team) = self.find_team(team_name).await? else {
            debug!("API-Football has no team named {}", team_name);
            return Ok(None);
        };

        let stats = self.team_statistics(team.id).await?;
        debug!("Fetched statistics for {} (id {})", team.name, team.id);
        Ok(Some(profile_from_statistics(&team.name, &stats)))
    }
}
