//! Weighted multi-metric scoring of a single chain.
//!
//! Each of the ten metrics contributes `score(value) * weight(value)` using the operator's
//! [`RankingSettings`]; a chain's overall score is the plain integer sum of those contributions.
//! The engine is pure: no I/O, no clock, the same inputs always give the same score.

use crate::{
    settings::RankingSettings,
    types::{ChainId, Metric, MetricReadings, MetricSample, WeightedScore},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    settings: Arc<RankingSettings>,
}

impl ScoringEngine {
    #[must_use]
    pub fn new(settings: Arc<RankingSettings>) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    /// Scores one chain from its latest streaming readings and its two static metrics.
    #[must_use]
    pub fn score(
        &self,
        chain: &ChainId,
        readings: &MetricReadings,
        required_confirmations: u32,
        reputation: u8,
    ) -> WeightedScore {
        let streaming = self.settings.weighted_readings(readings);

        let mut values = [0i64; 10];
        values[..streaming.len()].copy_from_slice(&streaming);
        values[Metric::RequiredConfirmations.index()] =
            self.settings.weighted_confirmations(required_confirmations);
        values[Metric::Reputation.index()] = self.settings.weighted_reputation(reputation);

        WeightedScore::new(chain.clone(), values)
    }

    /// Weighted contribution of a single streaming sample.
    #[cfg(test)]
    fn entry(&self, sample: &MetricSample) -> i64 {
        self.settings.weighted_sample(sample)
    }
}
