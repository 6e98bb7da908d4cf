use super::SettingsError;
use crate::types::{Metric, MetricReadings, MetricSample, MiningDistribution};
use rust_decimal::Decimal;
use std::{fmt, sync::Arc, time::Duration};

type RankFn<T> = Arc<dyn Fn(&T) -> i64 + Send + Sync>;

/// Pair of pure functions turning one metric value into a score and a weight.
///
/// The weighted value of a sample is `score(value) * weight(value)`.
pub struct RankingRule<T> {
    score: RankFn<T>,
    weight: RankFn<T>,
}

impl<T> Clone for RankingRule<T> {
    fn clone(&self) -> Self {
        Self { score: Arc::clone(&self.score), weight: Arc::clone(&self.weight) }
    }
}

impl<T> fmt::Debug for RankingRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankingRule").finish_non_exhaustive()
    }
}

impl<T: 'static> RankingRule<T> {
    pub fn new<S, W>(score: S, weight: W) -> Self
    where
        S: Fn(&T) -> i64 + Send + Sync + 'static,
        W: Fn(&T) -> i64 + Send + Sync + 'static,
    {
        Self { score: Arc::new(score), weight: Arc::new(weight) }
    }

    /// Rule whose weight does not depend on the value.
    pub fn with_weight<S>(score: S, weight: i64) -> Self
    where
        S: Fn(&T) -> i64 + Send + Sync + 'static,
    {
        Self::new(score, move |_| weight)
    }

    /// Rule that contributes nothing to the overall score.
    #[must_use]
    pub fn ignored() -> Self {
        Self::new(|_| 0, |_| 0)
    }

    #[must_use]
    pub fn score(&self, value: &T) -> i64 {
        (self.score)(value)
    }

    #[must_use]
    pub fn weight(&self, value: &T) -> i64 {
        (self.weight)(value)
    }

    #[must_use]
    pub fn weighted(&self, value: &T) -> i64 {
        self.score(value).saturating_mul(self.weight(value))
    }
}

/// One ranking rule per metric plus the minimum span between two emitted suggestions.
#[derive(Debug, Clone)]
pub struct RankingSettings {
    writing_cost: RankingRule<Decimal>,
    retrieval_cost: RankingRule<Decimal>,
    storage_fee: RankingRule<Decimal>,
    exchange_rate: RankingRule<Decimal>,
    block_time: RankingRule<f64>,
    transaction_throughput: RankingRule<f64>,
    mining_distribution: RankingRule<MiningDistribution>,
    network_hashrate: RankingRule<f64>,
    required_confirmations: RankingRule<u32>,
    reputation: RankingRule<u8>,
    min_suggestion_interval: Duration,
}

impl RankingSettings {
    #[must_use]
    pub fn builder() -> RankingSettingsBuilder {
        RankingSettingsBuilder::default()
    }

    #[must_use]
    pub fn min_suggestion_interval(&self) -> Duration {
        self.min_suggestion_interval
    }

    /// Weighted value of a single streaming sample.
    #[must_use]
    pub fn weighted_sample(&self, sample: &MetricSample) -> i64 {
        match sample {
            MetricSample::WritingCost(v) => self.writing_cost.weighted(v),
            MetricSample::RetrievalCost(v) => self.retrieval_cost.weighted(v),
            MetricSample::StorageFee(v) => self.storage_fee.weighted(v),
            MetricSample::ExchangeRate(v) => self.exchange_rate.weighted(v),
            MetricSample::BlockTime(v) => self.block_time.weighted(v),
            MetricSample::TransactionThroughput(v) => self.transaction_throughput.weighted(v),
            MetricSample::MiningDistribution(v) => self.mining_distribution.weighted(v),
            MetricSample::NetworkHashrate(v) => self.network_hashrate.weighted(v),
        }
    }

    /// Weighted values of the eight streaming metrics, in [`Metric::STREAMING`] order.
    #[must_use]
    pub fn weighted_readings(&self, readings: &MetricReadings) -> [i64; 8] {
        [
            self.writing_cost.weighted(&readings.writing_cost),
            self.retrieval_cost.weighted(&readings.retrieval_cost),
            self.storage_fee.weighted(&readings.storage_fee),
            self.exchange_rate.weighted(&readings.exchange_rate),
            self.block_time.weighted(&readings.block_time),
            self.transaction_throughput.weighted(&readings.transaction_throughput),
            self.mining_distribution.weighted(&readings.mining_distribution),
            self.network_hashrate.weighted(&readings.network_hashrate),
        ]
    }

    #[must_use]
    pub fn weighted_confirmations(&self, confirmations: u32) -> i64 {
        self.required_confirmations.weighted(&confirmations)
    }

    #[must_use]
    pub fn weighted_reputation(&self, reputation: u8) -> i64 {
        self.reputation.weighted(&reputation)
    }
}

/// Builder for [`RankingSettings`]. Every metric needs a rule; use [`RankingRule::ignored`] to
/// leave one out of the score.
#[derive(Debug, Default)]
pub struct RankingSettingsBuilder {
    writing_cost: Option<RankingRule<Decimal>>,
    retrieval_cost: Option<RankingRule<Decimal>>,
    storage_fee: Option<RankingRule<Decimal>>,
    exchange_rate: Option<RankingRule<Decimal>>,
    block_time: Option<RankingRule<f64>>,
    transaction_throughput: Option<RankingRule<f64>>,
    mining_distribution: Option<RankingRule<MiningDistribution>>,
    network_hashrate: Option<RankingRule<f64>>,
    required_confirmations: Option<RankingRule<u32>>,
    reputation: Option<RankingRule<u8>>,
    min_suggestion_interval: Duration,
}

impl RankingSettingsBuilder {
    #[must_use]
    pub fn writing_cost(mut self, rule: RankingRule<Decimal>) -> Self {
        self.writing_cost = Some(rule);
        self
    }

    #[must_use]
    pub fn retrieval_cost(mut self, rule: RankingRule<Decimal>) -> Self {
        self.retrieval_cost = Some(rule);
        self
    }

    #[must_use]
    pub fn storage_fee(mut self, rule: RankingRule<Decimal>) -> Self {
        self.storage_fee = Some(rule);
        self
    }

    #[must_use]
    pub fn exchange_rate(mut self, rule: RankingRule<Decimal>) -> Self {
        self.exchange_rate = Some(rule);
        self
    }

    #[must_use]
    pub fn block_time(mut self, rule: RankingRule<f64>) -> Self {
        self.block_time = Some(rule);
        self
    }

    #[must_use]
    pub fn transaction_throughput(mut self, rule: RankingRule<f64>) -> Self {
        self.transaction_throughput = Some(rule);
        self
    }

    #[must_use]
    pub fn mining_distribution(mut self, rule: RankingRule<MiningDistribution>) -> Self {
        self.mining_distribution = Some(rule);
        self
    }

    #[must_use]
    pub fn network_hashrate(mut self, rule: RankingRule<f64>) -> Self {
        self.network_hashrate = Some(rule);
        self
    }

    #[must_use]
    pub fn required_confirmations(mut self, rule: RankingRule<u32>) -> Self {
        self.required_confirmations = Some(rule);
        self
    }

    #[must_use]
    pub fn reputation(mut self, rule: RankingRule<u8>) -> Self {
        self.reputation = Some(rule);
        self
    }

    /// Minimum time between two emitted suggestions (default: zero, no throttling).
    #[must_use]
    pub fn min_suggestion_interval(mut self, interval: Duration) -> Self {
        self.min_suggestion_interval = interval;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingRanking`] for the first metric without a rule.
    pub fn build(self) -> Result<RankingSettings, SettingsError> {
        fn require<T>(rule: Option<T>, metric: Metric) -> Result<T, SettingsError> {
            rule.ok_or(SettingsError::MissingRanking(metric))
        }

        Ok(RankingSettings {
            writing_cost: require(self.writing_cost, Metric::WritingCost)?,
            retrieval_cost: require(self.retrieval_cost, Metric::RetrievalCost)?,
            storage_fee: require(self.storage_fee, Metric::StorageFee)?,
            exchange_rate: require(self.exchange_rate, Metric::ExchangeRate)?,
            block_time: require(self.block_time, Metric::BlockTime)?,
            transaction_throughput: require(
                self.transaction_throughput,
                Metric::TransactionThroughput,
            )?,
            mining_distribution: require(self.mining_distribution, Metric::MiningDistribution)?,
            network_hashrate: require(self.network_hashrate, Metric::NetworkHashrate)?,
            required_confirmations: require(
                self.required_confirmations,
                Metric::RequiredConfirmations,
            )?,
            reputation: require(self.reputation, Metric::Reputation)?,
            min_suggestion_interval: self.min_suggestion_interval,
        })
    }
}
