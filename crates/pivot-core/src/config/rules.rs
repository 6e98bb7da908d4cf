//! Declarative ranking and validation rules and their mapping onto the settings closures.

use crate::{
    settings::{RankingRule, RankingSettings, SettingsError, ValidationRule, ValidationSettings},
    types::{Metric, MiningDistribution},
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reduces a metric value to the number band tables and ranges are evaluated against.
pub trait ConfigValue {
    fn config_value(&self) -> f64;
}

impl ConfigValue for f64 {
    fn config_value(&self) -> f64 {
        *self
    }
}

impl ConfigValue for Decimal {
    fn config_value(&self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl ConfigValue for u32 {
    fn config_value(&self) -> f64 {
        f64::from(*self)
    }
}

impl ConfigValue for u8 {
    fn config_value(&self) -> f64 {
        f64::from(*self)
    }
}

/// The largest single miner share, in percent.
impl ConfigValue for MiningDistribution {
    fn config_value(&self) -> f64 {
        self.values().copied().fold(0.0, f64::max)
    }
}

/// One row of a band table: values strictly below `below` score `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub below: f64,
    pub score: i64,
}

/// Band table for one metric.
///
/// Bands are checked in ascending `below` order; the first one the value falls under decides the
/// score. Values above every band score `default_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRankingConfig {
    /// Multiplier applied to the band score. Defaults to `1`.
    #[serde(default = "default_weight")]
    pub weight: i64,

    #[serde(default)]
    pub bands: Vec<ScoreBand>,

    /// Score for values not covered by any band. Defaults to `0`.
    #[serde(default)]
    pub default_score: i64,
}

fn default_weight() -> i64 {
    1
}

impl MetricRankingConfig {
    /// Score of `value` according to the band table.
    #[must_use]
    pub fn score(&self, value: f64) -> i64 {
        self.bands.iter().find(|b| value < b.below).map_or(self.default_score, |b| b.score)
    }

    /// Returns `true` if band limits are strictly ascending and none is NaN.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.bands.iter().all(|b| !b.below.is_nan()) &&
            self.bands.windows(2).all(|w| w[0].below < w[1].below)
    }

    fn rule<T: ConfigValue + 'static>(&self) -> RankingRule<T> {
        let table = self.clone();
        RankingRule::with_weight(move |v: &T| table.score(v.config_value()), self.weight)
    }
}

/// Band tables per metric. A metric without a table does not contribute to the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub writing_cost: Option<MetricRankingConfig>,
    #[serde(default)]
    pub retrieval_cost: Option<MetricRankingConfig>,
    #[serde(default)]
    pub storage_fee: Option<MetricRankingConfig>,
    #[serde(default)]
    pub exchange_rate: Option<MetricRankingConfig>,
    #[serde(default)]
    pub block_time: Option<MetricRankingConfig>,
    #[serde(default)]
    pub transaction_throughput: Option<MetricRankingConfig>,
    #[serde(default)]
    pub mining_distribution: Option<MetricRankingConfig>,
    #[serde(default)]
    pub network_hashrate: Option<MetricRankingConfig>,
    #[serde(default)]
    pub required_confirmations: Option<MetricRankingConfig>,
    #[serde(default)]
    pub reputation: Option<MetricRankingConfig>,
}

fn ranking_rule<T: ConfigValue + 'static>(table: Option<&MetricRankingConfig>) -> RankingRule<T> {
    table.map_or_else(RankingRule::ignored, MetricRankingConfig::rule)
}

impl RankingConfig {
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<&MetricRankingConfig> {
        match metric {
            Metric::WritingCost => self.writing_cost.as_ref(),
            Metric::RetrievalCost => self.retrieval_cost.as_ref(),
            Metric::StorageFee => self.storage_fee.as_ref(),
            Metric::ExchangeRate => self.exchange_rate.as_ref(),
            Metric::BlockTime => self.block_time.as_ref(),
            Metric::TransactionThroughput => self.transaction_throughput.as_ref(),
            Metric::MiningDistribution => self.mining_distribution.as_ref(),
            Metric::NetworkHashrate => self.network_hashrate.as_ref(),
            Metric::RequiredConfirmations => self.required_confirmations.as_ref(),
            Metric::Reputation => self.reputation.as_ref(),
        }
    }

    /// Builds [`RankingSettings`] from the band tables.
    ///
    /// # Errors
    ///
    /// Propagates [`SettingsError`] from the settings builder.
    pub fn to_settings(&self, min_interval: Duration) -> Result<RankingSettings, SettingsError> {
        RankingSettings::builder()
            .writing_cost(ranking_rule(self.writing_cost.as_ref()))
            .retrieval_cost(ranking_rule(self.retrieval_cost.as_ref()))
            .storage_fee(ranking_rule(self.storage_fee.as_ref()))
            .exchange_rate(ranking_rule(self.exchange_rate.as_ref()))
            .block_time(ranking_rule(self.block_time.as_ref()))
            .transaction_throughput(ranking_rule(self.transaction_throughput.as_ref()))
            .mining_distribution(ranking_rule(self.mining_distribution.as_ref()))
            .network_hashrate(ranking_rule(self.network_hashrate.as_ref()))
            .required_confirmations(ranking_rule(self.required_confirmations.as_ref()))
            .reputation(ranking_rule(self.reputation.as_ref()))
            .min_suggestion_interval(min_interval)
            .build()
    }
}

/// Accepted range for one metric plus the grace period of a violation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValidationConfig {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,

    /// How long a violation may last before it counts. Ignored for the two static metrics.
    #[serde(default)]
    pub grace_seconds: u64,
}

impl MetricValidationConfig {
    /// Returns `true` if `value` lies within `[min, max]`.
    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    fn rule<T: ConfigValue + 'static>(&self) -> ValidationRule<T> {
        let range = self.clone();
        ValidationRule::new(
            move |v: &T| range.accepts(v.config_value()),
            Duration::from_secs(self.grace_seconds),
        )
    }
}

/// How the metrics listed in `disqualify_on` combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisqualifyMatch {
    /// A chain is disqualified as soon as one listed metric fails.
    #[default]
    Any,
    /// A chain is disqualified only when every listed metric fails.
    All,
}

/// Ranges per metric and the disqualification rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub writing_cost: Option<MetricValidationConfig>,
    #[serde(default)]
    pub retrieval_cost: Option<MetricValidationConfig>,
    #[serde(default)]
    pub storage_fee: Option<MetricValidationConfig>,
    #[serde(default)]
    pub exchange_rate: Option<MetricValidationConfig>,
    #[serde(default)]
    pub block_time: Option<MetricValidationConfig>,
    #[serde(default)]
    pub transaction_throughput: Option<MetricValidationConfig>,
    #[serde(default)]
    pub mining_distribution: Option<MetricValidationConfig>,
    #[serde(default)]
    pub network_hashrate: Option<MetricValidationConfig>,
    #[serde(default)]
    pub required_confirmations: Option<MetricValidationConfig>,
    #[serde(default)]
    pub reputation: Option<MetricValidationConfig>,

    /// Metrics whose failure disqualifies a chain. Empty means no chain is ever disqualified.
    #[serde(default)]
    pub disqualify_on: Vec<Metric>,

    #[serde(default)]
    pub disqualify_match: DisqualifyMatch,
}

impl ValidationConfig {
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<&MetricValidationConfig> {
        match metric {
            Metric::WritingCost => self.writing_cost.as_ref(),
            Metric::RetrievalCost => self.retrieval_cost.as_ref(),
            Metric::StorageFee => self.storage_fee.as_ref(),
            Metric::ExchangeRate => self.exchange_rate.as_ref(),
            Metric::BlockTime => self.block_time.as_ref(),
            Metric::TransactionThroughput => self.transaction_throughput.as_ref(),
            Metric::MiningDistribution => self.mining_distribution.as_ref(),
            Metric::NetworkHashrate => self.network_hashrate.as_ref(),
            Metric::RequiredConfirmations => self.required_confirmations.as_ref(),
            Metric::Reputation => self.reputation.as_ref(),
        }
    }

    /// Builds [`ValidationSettings`] from the configured ranges.
    #[must_use]
    pub fn to_settings(&self) -> ValidationSettings {
        let mut settings = ValidationSettings::new();
        if let Some(range) = &self.writing_cost {
            settings = settings.writing_cost(range.rule());
        }
        if let Some(range) = &self.retrieval_cost {
            settings = settings.retrieval_cost(range.rule());
        }
        if let Some(range) = &self.storage_fee {
            settings = settings.storage_fee(range.rule());
        }
        if let Some(range) = &self.exchange_rate {
            settings = settings.exchange_rate(range.rule());
        }
        if let Some(range) = &self.block_time {
            settings = settings.block_time(range.rule());
        }
        if let Some(range) = &self.transaction_throughput {
            settings = settings.transaction_throughput(range.rule());
        }
        if let Some(range) = &self.mining_distribution {
            settings = settings.mining_distribution(range.rule());
        }
        if let Some(range) = &self.network_hashrate {
            settings = settings.network_hashrate(range.rule());
        }
        if let Some(range) = &self.required_confirmations {
            settings = settings.required_confirmations(range.rule());
        }
        if let Some(range) = &self.reputation {
            settings = settings.reputation(range.rule());
        }

        if self.disqualify_on.is_empty() {
            return settings;
        }
        let watched: Vec<usize> = self.disqualify_on.iter().map(|m| m.index()).collect();
        match self.disqualify_match {
            DisqualifyMatch::Any => {
                settings.disqualify_when(move |passes| watched.iter().any(|&i| !passes[i]))
            }
            DisqualifyMatch::All => {
                settings.disqualify_when(move |passes| watched.iter().all(|&i| !passes[i]))
            }
        }
    }
}
