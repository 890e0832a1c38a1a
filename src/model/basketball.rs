//! Gaussian totals model for basketball
//!
//! Model: `expected_home = (home.offensive_rating + away.defensive_rating) / 2`,
//! mirrored for the away side. The game total is treated as
//! `N(expected_home + expected_away, sd^2)` with a fixed `sd` (12.5 by
//! default, a typical NBA figure rather than a fitted one).

use super::ProbabilityModel;
use crate::error::{BotError, Result};
use crate::types::{ScoringProfile, TeamRatings};

const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7)
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t) * (-x * x).exp();

    sign * y
}

/// Standard normal CDF built on the rational `erf` approximation
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasketballForecast {
    pub home_team: String,
    pub away_team: String,
    pub home_offensive_rating: f64,
    pub away_offensive_rating: f64,
    pub expected_home: f64,
    pub expected_away: f64,
    pub expected_total: f64,
    /// `expected_home - expected_away`
    pub spread: f64,
    /// `(threshold, P(total > threshold))`
    pub overs: Vec<(f64, f64)>,
}

impl BasketballForecast {
    pub fn over(&self, threshold: f64) -> Option<f64> {
        self.overs
            .iter()
            .find(|(t, _)| (t - threshold).abs() < f64::EPSILON)
            .map(|(_, p)| *p)
    }
}

#[derive(Debug, Clone)]
pub struct GaussianTotalsModel {
    pub sd: f64,
    pub thresholds: Vec<f64>,
}

impl GaussianTotalsModel {
    pub fn new(sd: f64, thresholds: Vec<f64>) -> Self {
        Self { sd, thresholds }
    }

    /// P(total > threshold)
    pub fn p_over(&self, expected_total: f64, threshold: f64) -> f64 {
        1.0 - normal_cdf((threshold - expected_total) / self.sd)
    }
}

impl Default for GaussianTotalsModel {
    fn default() -> Self {
        Self::new(12.5, vec![210.0, 215.0, 220.0, 225.0])
    }
}

impl ProbabilityModel for GaussianTotalsModel {
    type Output = BasketballForecast;

    fn forecast(
        &self,
        home: &ScoringProfile,
        away: &ScoringProfile,
    ) -> Result<BasketballForecast> {
        if self.sd.is_nan() || self.sd <= 0.0 {
            return Err(BotError::Internal(format!(
                "basketball sd must be positive, got {}",
                self.sd
            )));
        }

        let (home_off, home_def, away_off, away_def) = match (home.ratings, away.ratings) {
            (
                TeamRatings::Basketball {
                    offensive_rating: home_off,
                    defensive_rating: home_def,
                },
                TeamRatings::Basketball {
                    offensive_rating: away_off,
                    defensive_rating: away_def,
                },
            ) => (home_off, home_def, away_off, away_def),
            _ => {
                return Err(BotError::Internal(
                    "basketball model needs basketball profiles".to_string(),
                ))
            }
        };

        let expected_home = (home_off + away_def) / 2.0;
        let expected_away = (away_off + home_def) / 2.0;
        let expected_total = expected_home + expected_away;

        Ok(BasketballForecast {
            home_team: home.team_name.clone(),
            away_team: away.team_name.clone(),
            home_offensive_rating: home_off,
            away_offensive_rating: away_off,
            expected_home,
            expected_away,
            expected_total,
            spread: expected_home - expected_away,
            overs: self
                .thresholds
                .iter()
                .map(|&t| (t, self.p_over(expected_total, t)))
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "gaussian_totals"
    }
}
