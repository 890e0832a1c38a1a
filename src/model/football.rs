//! Independent-Poisson scoreline model for football
//!
//! Expected goals are attack x opposing defence:
//! `lambda_home = home.avg_goals_for * away.avg_goals_against` (and the
//! mirror for the away side). Every aggregate is divided by the grid mass so
//! win/draw/loss always sum to 1 despite truncation at `max_goals`.

use super::ProbabilityModel;
use crate::error::{BotError, Result};
use crate::types::{ScoringProfile, TeamRatings};

/// P(X = k) for X ~ Poisson(lambda). A non-positive lambda is a point mass at 0.
pub fn poisson(k: u32, lambda: f64) -> f64 {
    if lambda.is_nan() || lambda <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    let mut p = (-lambda).exp();
    for i in 1..=k {
        p *= lambda / i as f64;
    }
    p
}

/// Joint probability table `P(home = i, away = j)` for `i, j` in `0..=max_goals`
#[derive(Debug, Clone, PartialEq)]
pub struct ScorelineGrid {
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub max_goals: u32,
    cells: Vec<Vec<f64>>,
    mass: f64,
}

impl ScorelineGrid {
    pub fn new(lambda_home: f64, lambda_away: f64, max_goals: u32) -> Self {
        let cells: Vec<Vec<f64>> = (0..=max_goals)
            .map(|i| {
                let p_home = poisson(i, lambda_home);
                (0..=max_goals)
                    .map(|j| p_home * poisson(j, lambda_away))
                    .collect()
            })
            .collect();
        let mass: f64 = cells.iter().flatten().sum();

        Self {
            lambda_home,
            lambda_away,
            max_goals,
            cells,
            mass,
        }
    }

    /// Raw probability of an exact score (not renormalized)
    pub fn cell(&self, home: u32, away: u32) -> f64 {
        self.cells
            .get(home as usize)
            .and_then(|row| row.get(away as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Total probability covered by the truncated grid
    pub fn mass(&self) -> f64 {
        self.mass
    }

    fn share_where(&self, pred: impl Fn(u32, u32) -> bool) -> f64 {
        let mut sum = 0.0;
        for (i, row) in self.cells.iter().enumerate() {
            for (j, p) in row.iter().enumerate() {
                if pred(i as u32, j as u32) {
                    sum += p;
                }
            }
        }
        if self.mass > 0.0 {
            sum / self.mass
        } else {
            0.0
        }
    }

    pub fn home_win(&self) -> f64 {
        self.share_where(|i, j| i > j)
    }

    pub fn draw(&self) -> f64 {
        self.share_where(|i, j| i == j)
    }

    pub fn away_win(&self) -> f64 {
        self.share_where(|i, j| i < j)
    }

    /// Probability of more than `line` total goals
    pub fn over(&self, line: f64) -> f64 {
        self.share_where(|i, j| (i + j) as f64 > line)
    }

    pub fn both_teams_score(&self) -> f64 {
        self.share_where(|i, j| i >= 1 && j >= 1)
    }

    /// Highest-probability cell; the first maximum in row-major order wins
    pub fn most_likely(&self) -> (u32, u32, f64) {
        let mut best = (0, 0, f64::MIN);
        for (i, row) in self.cells.iter().enumerate() {
            for (j, &p) in row.iter().enumerate() {
                if p > best.2 {
                    best = (i as u32, j as u32, p);
                }
            }
        }
        let share = if self.mass > 0.0 { best.2 / self.mass } else { 0.0 };
        (best.0, best.1, share)
    }
}

/// Football forecast, all probabilities in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct FootballForecast {
    pub home_team: String,
    pub away_team: String,
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    /// `(line, probability)` per configured over line
    pub overs: Vec<(f64, f64)>,
    pub both_teams_score: f64,
    pub most_likely_score: (u32, u32),
    pub most_likely_probability: f64,
}

impl FootballForecast {
    pub fn over(&self, line: f64) -> Option<f64> {
        self.overs
            .iter()
            .find(|(l, _)| (l - line).abs() < f64::EPSILON)
            .map(|(_, p)| *p)
    }
}

#[derive(Debug, Clone)]
pub struct PoissonModel {
    pub max_goals: u32,
    pub over_lines: Vec<f64>,
}

impl PoissonModel {
    pub fn new(max_goals: u32, over_lines: Vec<f64>) -> Self {
        Self {
            max_goals,
            over_lines,
        }
    }

    /// `(lambda_home, lambda_away)` for two football profiles
    pub fn expected_goals(home: &ScoringProfile, away: &ScoringProfile) -> Result<(f64, f64)> {
        match (home.ratings, away.ratings) {
            (
                TeamRatings::Football {
                    avg_goals_for: home_for,
                    avg_goals_against: home_against,
                },
                TeamRatings::Football {
                    avg_goals_for: away_for,
                    avg_goals_against: away_against,
                },
            ) => Ok((
                (home_for * away_against).max(0.0),
                (away_for * home_against).max(0.0),
            )),
            _ => Err(BotError::Internal(
                "football model needs football profiles".to_string(),
            )),
        }
    }

    pub fn from_lambdas(
        &self,
        home_team: &str,
        away_team: &str,
        lambda_home: f64,
        lambda_away: f64,
    ) -> FootballForecast {
        let grid = ScorelineGrid::new(lambda_home, lambda_away, self.max_goals);
        let (best_home, best_away, best_p) = grid.most_likely();

        FootballForecast {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            lambda_home,
            lambda_away,
            home_win: grid.home_win(),
            draw: grid.draw(),
            away_win: grid.away_win(),
            overs: self
                .over_lines
                .iter()
                .map(|&line| (line, grid.over(line)))
                .collect(),
            both_teams_score: grid.both_teams_score(),
            most_likely_score: (best_home, best_away),
            most_likely_probability: best_p,
        }
    }
}

impl Default for PoissonModel {
    fn default() -> Self {
        Self::new(5, vec![0.5, 1.5, 2.5, 3.5])
    }
}

impl ProbabilityModel for PoissonModel {
    type Output = FootballForecast;

    fn forecast(&self, home: &ScoringProfile, away: &ScoringProfile) -> Result<FootballForecast> {
        let (lambda_home, lambda_away) = Self::expected_goals(home, away)?;
        Ok(self.from_lambdas(&home.team_name, &away.team_name, lambda_home, lambda_away))
    }

    fn name(&self) -> &str {
        "poisson"
    }
}
