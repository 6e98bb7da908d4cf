//! Operator-supplied scoring and validation rules.
//!
//! Settings are built once at startup and shared read-only (behind `Arc`) by every chain pipeline
//! and the advisor.

pub mod ranking;
pub mod validation;

pub use ranking::{RankingRule, RankingSettings, RankingSettingsBuilder};
pub use validation::{DisqualifyFn, ValidationRule, ValidationSettings};

use crate::types::Metric;
use thiserror::Error;

/// Highest reputation a chain may be assigned.
pub const MAX_REPUTATION: u8 = 10;

/// Build-time settings errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// No ranking rule was provided for a metric.
    #[error("Missing ranking rule for metric {0}")]
    MissingRanking(Metric),

    /// Reputation outside `0..=10`.
    #[error("Invalid reputation {0}, expected 0..={max}", max = MAX_REPUTATION)]
    InvalidReputation(u8),
}
