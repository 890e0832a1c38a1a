//! GoalGuru Sports Probability Bot
//!
//! A chat bot that answers `TeamA x TeamB` queries with football and
//! basketball probabilities, metered by a credit/VIP ledger funded through
//! a payment processor.
//!
//! ## Architecture
//!
//! ```text
//! Telegram → bot (ChatEvent) → gate → stats (profiles) → model (forecast)
//!                                │
//!                                └→ ledger (debit) → storage (sqlite)
//!
//! checkout → payment processor → webhook → reconciler → ledger
//! ```

pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod model;
pub mod payments;
pub mod server;
pub mod stats;
pub mod storage;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod integration_tests;
