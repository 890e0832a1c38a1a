//! Configuration loading
//!
//! Values come from an optional TOML file, overridden by `GOALGURU__*`
//! environment variables (after `.env` is loaded).

use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    pub payments: Option<PaymentsConfig>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("GOALGURU")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.database.path = shellexpand::full(&config.database.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| config.database.path.clone());

        config
            .validate()
            .map_err(|errors| config::ConfigError::Message(errors.join("; ")))?;

        Ok(config)
    }

    /// Reject values that would make every request fail or blow up the
    /// scoreline grid
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.engine.max_goals == 0 || self.engine.max_goals > MAX_GRID_GOALS {
            errors.push(format!(
                "engine.max_goals must be between 1 and {}, got {}",
                MAX_GRID_GOALS, self.engine.max_goals
            ));
        }
        if self.engine.basketball_sd <= 0.0 || !self.engine.basketball_sd.is_finite() {
            errors.push(format!(
                "engine.basketball_sd must be positive, got {}",
                self.engine.basketball_sd
            ));
        }

        if self.ledger.analysis_cost < 0 {
            errors.push(format!(
                "ledger.analysis_cost must not be negative, got {}",
                self.ledger.analysis_cost
            ));
        }
        if self.ledger.initial_credits < 0 {
            errors.push(format!(
                "ledger.initial_credits must not be negative, got {}",
                self.ledger.initial_credits
            ));
        }
        if self.ledger.vip_days <= 0 {
            errors.push(format!(
                "ledger.vip_days must be positive, got {}",
                self.ledger.vip_days
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Upper bound for `engine.max_goals`
pub const MAX_GRID_GOALS: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/goalguru.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Required for `/admin/stats`; the route rejects everything when unset
    pub admin_token: Option<String>,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_initial_credits")]
    pub initial_credits: i64,
    #[serde(default = "default_analysis_cost")]
    pub analysis_cost: i64,
    #[serde(default = "default_vip_days")]
    pub vip_days: i64,
}

fn default_initial_credits() -> i64 {
    5
}

fn default_analysis_cost() -> i64 {
    1
}

fn default_vip_days() -> i64 {
    30
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_credits: default_initial_credits(),
            analysis_cost: default_analysis_cost(),
            vip_days: default_vip_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Highest goal count per side in the scoreline grid
    #[serde(default = "default_max_goals")]
    pub max_goals: u32,
    #[serde(default = "default_over_lines")]
    pub over_lines: Vec<f64>,
    /// Assumed standard deviation of a basketball game total
    #[serde(default = "default_basketball_sd")]
    pub basketball_sd: f64,
    #[serde(default = "default_basketball_thresholds")]
    pub basketball_thresholds: Vec<f64>,
}

fn default_max_goals() -> u32 {
    5
}

fn default_over_lines() -> Vec<f64> {
    vec![0.5, 1.5, 2.5, 3.5]
}

fn default_basketball_sd() -> f64 {
    12.5
}

fn default_basketball_thresholds() -> Vec<f64> {
    vec![210.0, 215.0, 220.0, 225.0]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_goals: default_max_goals(),
            over_lines: default_over_lines(),
            basketball_sd: default_basketball_sd(),
            basketball_thresholds: default_basketball_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_football_api_base")]
    pub football_api_base: String,
    /// API-Football key; without it only league averages are used
    pub football_api_key: Option<String>,
    /// Season to read statistics for; defaults to the current year
    pub season: Option<i32>,
    #[serde(default = "default_stats_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_football_api_base() -> String {
    "https://v3.football.api-sports.io".to_string()
}

fn default_stats_timeout_ms() -> u64 {
    4000
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            football_api_base: default_football_api_base(),
            football_api_key: None,
            season: None,
            timeout_ms: default_stats_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_payments_api_base")]
    pub api_base: String,
    pub access_token: String,
    pub notification_url: Option<String>,
    /// Secret for `x-signature` verification; unsigned webhooks are accepted when unset
    pub webhook_secret: Option<String>,
    #[serde(default = "default_vip_price")]
    pub vip_price: Decimal,
    #[serde(default = "default_credit_packs")]
    pub credit_packs: Vec<CreditPack>,
    #[serde(default = "default_payments_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_payments_api_base() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_vip_price() -> Decimal {
    dec!(29.90)
}

fn default_credit_packs() -> Vec<CreditPack> {
    vec![
        CreditPack { credits: 5, price: dec!(4.90) },
        CreditPack { credits: 15, price: dec!(12.90) },
        CreditPack { credits: 50, price: dec!(39.90) },
    ]
}

fn default_payments_timeout_ms() -> u64 {
    5000
}

impl PaymentsConfig {
    pub fn pack(&self, credits: i64) -> Option<&CreditPack> {
        self.credit_packs.iter().find(|p| p.credits == credits)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreditPack {
    pub credits: i64,
    pub price: Decimal,
}
