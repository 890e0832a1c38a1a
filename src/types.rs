//! Core types used across the bot

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque chat-platform user id
pub type UserId = i64;

/// Chat the reply must be delivered to
pub type ChatId = i64;

/// Sport selector carried with every analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Football,
    Basketball,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Football => "football",
            Sport::Basketball => "basketball",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Sport::Football => "⚽",
            Sport::Basketball => "🏀",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "football" | "futebol" | "soccer" => Ok(Sport::Football),
            "basketball" | "basquete" | "nba" => Ok(Sport::Basketball),
            other => Err(format!("unknown sport: {}", other)),
        }
    }
}

/// Ledger view of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub credits: i64,
    /// Stored flag; only meaningful while `vip_expires_at` is in the future
    pub vip: bool,
    pub vip_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_vip_active(&self, now: DateTime<Utc>) -> bool {
        self.vip && self.vip_expires_at.map(|at| at > now).unwrap_or(false)
    }

    /// Whole days of VIP left, rounded up. Zero when not VIP.
    pub fn vip_days_left(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_vip_active(now) {
            return 0;
        }
        match self.vip_expires_at {
            Some(at) => {
                let ms = (at - now).num_milliseconds();
                (ms + 86_399_999) / 86_400_000
            }
            None => 0,
        }
    }
}

/// Team ratings as supplied by a stats provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sport", rename_all = "lowercase")]
pub enum TeamRatings {
    Football {
        avg_goals_for: f64,
        avg_goals_against: f64,
    },
    Basketball {
        offensive_rating: f64,
        defensive_rating: f64,
    },
}

impl TeamRatings {
    /// League-average profile used when a team cannot be resolved
    pub fn league_average(sport: Sport) -> Self {
        match sport {
            Sport::Football => TeamRatings::Football {
                avg_goals_for: 1.5,
                avg_goals_against: 1.2,
            },
            Sport::Basketball => TeamRatings::Basketball {
                offensive_rating: 113.5,
                defensive_rating: 111.2,
            },
        }
    }

    pub fn sport(&self) -> Sport {
        match self {
            TeamRatings::Football { .. } => Sport::Football,
            TeamRatings::Basketball { .. } => Sport::Basketball,
        }
    }
}

/// Scoring profile for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub team_name: String,
    pub ratings: TeamRatings,
}

impl ScoringProfile {
    pub fn new(team_name: impl Into<String>, ratings: TeamRatings) -> Self {
        Self {
            team_name: team_name.into(),
            ratings,
        }
    }

    pub fn league_average(team_name: impl Into<String>, sport: Sport) -> Self {
        Self::new(team_name, TeamRatings::league_average(sport))
    }

    pub fn sport(&self) -> Sport {
        self.ratings.sport()
    }
}

/// Append-only log entry for a delivered analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub user_id: UserId,
    pub sport: Sport,
    pub query: String,
    pub result: String,
    pub created_at: DateTime<Utc>,
}

/// What a payment buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Vip,
    Credits,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Vip => "vip",
            PaymentKind::Credits => "credits",
        }
    }
}

impl FromStr for PaymentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vip" => Ok(PaymentKind::Vip),
            "credits" => Ok(PaymentKind::Credits),
            other => Err(format!("unknown payment kind: {}", other)),
        }
    }
}

/// `Pending -> Confirmed` is the only transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "confirmed" => Ok(PaymentStatus::Confirmed),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Payment awaiting (or past) processor confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub user_id: UserId,
    pub kind: PaymentKind,
    /// Price charged, in BRL
    pub amount: Decimal,
    /// Credits granted on confirmation (zero for VIP)
    pub credits: i64,
    pub external_reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn pending(
        user_id: UserId,
        kind: PaymentKind,
        amount: Decimal,
        credits: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            credits,
            external_reference: external_reference(kind, user_id, created_at),
            status: PaymentStatus::Pending,
            created_at,
        }
    }
}

/// `kind-userId-createdAtMillis`
pub fn external_reference(kind: PaymentKind, user_id: UserId, created_at: DateTime<Utc>) -> String {
    format!("{}-{}-{}", kind.as_str(), user_id, created_at.timestamp_millis())
}

/// Split an external reference back into its parts.
pub fn parse_external_reference(reference: &str) -> Option<(PaymentKind, UserId, i64)> {
    let (kind, rest) = reference.split_once('-')?;
    let (user, ts) = rest.rsplit_once('-')?;
    Some((kind.parse().ok()?, user.parse().ok()?, ts.parse().ok()?))
}

/// Inbound chat event, already normalized by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    Command {
        name: String,
        args: String,
        user_id: UserId,
        chat_id: ChatId,
    },
    Text {
        text: String,
        user_id: UserId,
        chat_id: ChatId,
    },
    Button {
        data: String,
        user_id: UserId,
        chat_id: ChatId,
    },
}

impl ChatEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            ChatEvent::Command { user_id, .. }
            | ChatEvent::Text { user_id, .. }
            | ChatEvent::Button { user_id, .. } => *user_id,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            ChatEvent::Command { chat_id, .. }
            | ChatEvent::Text { chat_id, .. }
            | ChatEvent::Button { chat_id, .. } => *chat_id,
        }
    }
}
