use crate::types::{Metric, MetricSample, MiningDistribution, ValidationResult};
use rust_decimal::Decimal;
use std::{fmt, sync::Arc, time::Duration};

type PredicateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Predicate over the ten per-metric booleans of a chain, in [`Metric::ALL`] order.
/// Returning `true` makes the chain ineligible as a switchover target.
pub type DisqualifyFn = Arc<dyn Fn(&[bool; 10]) -> bool + Send + Sync>;

/// "Is this value within range?" plus the grace period a violation may last before it counts.
pub struct ValidationRule<T> {
    predicate: PredicateFn<T>,
    grace: Duration,
}

impl<T> Clone for ValidationRule<T> {
    fn clone(&self) -> Self {
        Self { predicate: Arc::clone(&self.predicate), grace: self.grace }
    }
}

impl<T> fmt::Debug for ValidationRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule").field("grace", &self.grace).finish_non_exhaustive()
    }
}

impl<T> ValidationRule<T> {
    pub fn new<P>(predicate: P, grace: Duration) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self { predicate: Arc::new(predicate), grace }
    }

    #[must_use]
    pub fn check(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    #[must_use]
    pub fn grace(&self) -> Duration {
        self.grace
    }
}

/// Per-metric validation rules and the disqualification predicate.
///
/// Every rule is optional: a metric without one always passes, with zero grace. Without a
/// disqualification predicate no chain is ever disqualified.
#[derive(Clone, Default)]
pub struct ValidationSettings {
    writing_cost: Option<ValidationRule<Decimal>>,
    retrieval_cost: Option<ValidationRule<Decimal>>,
    storage_fee: Option<ValidationRule<Decimal>>,
    exchange_rate: Option<ValidationRule<Decimal>>,
    block_time: Option<ValidationRule<f64>>,
    transaction_throughput: Option<ValidationRule<f64>>,
    mining_distribution: Option<ValidationRule<MiningDistribution>>,
    network_hashrate: Option<ValidationRule<f64>>,
    required_confirmations: Option<ValidationRule<u32>>,
    reputation: Option<ValidationRule<u8>>,
    disqualify: Option<DisqualifyFn>,
}

impl fmt::Debug for ValidationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<Metric> =
            Metric::ALL.iter().copied().filter(|m| self.is_configured(*m)).collect();
        f.debug_struct("ValidationSettings")
            .field("configured", &configured)
            .field("has_disqualifier", &self.disqualify.is_some())
            .finish()
    }
}

impl ValidationSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn writing_cost(mut self, rule: ValidationRule<Decimal>) -> Self {
        self.writing_cost = Some(rule);
        self
    }

    #[must_use]
    pub fn retrieval_cost(mut self, rule: ValidationRule<Decimal>) -> Self {
        self.retrieval_cost = Some(rule);
        self
    }

    #[must_use]
    pub fn storage_fee(mut self, rule: ValidationRule<Decimal>) -> Self {
        self.storage_fee = Some(rule);
        self
    }

    #[must_use]
    pub fn exchange_rate(mut self, rule: ValidationRule<Decimal>) -> Self {
        self.exchange_rate = Some(rule);
        self
    }

    #[must_use]
    pub fn block_time(mut self, rule: ValidationRule<f64>) -> Self {
        self.block_time = Some(rule);
        self
    }

    #[must_use]
    pub fn transaction_throughput(mut self, rule: ValidationRule<f64>) -> Self {
        self.transaction_throughput = Some(rule);
        self
    }

    #[must_use]
    pub fn mining_distribution(mut self, rule: ValidationRule<MiningDistribution>) -> Self {
        self.mining_distribution = Some(rule);
        self
    }

    #[must_use]
    pub fn network_hashrate(mut self, rule: ValidationRule<f64>) -> Self {
        self.network_hashrate = Some(rule);
        self
    }

    #[must_use]
    pub fn required_confirmations(mut self, rule: ValidationRule<u32>) -> Self {
        self.required_confirmations = Some(rule);
        self
    }

    #[must_use]
    pub fn reputation(mut self, rule: ValidationRule<u8>) -> Self {
        self.reputation = Some(rule);
        self
    }

    /// Sets the predicate deciding whether a chain is ineligible as a switchover target.
    #[must_use]
    pub fn disqualify_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[bool; 10]) -> bool + Send + Sync + 'static,
    {
        self.disqualify = Some(Arc::new(predicate));
        self
    }

    /// Returns `true` if `metric` has a rule.
    #[must_use]
    pub fn is_configured(&self, metric: Metric) -> bool {
        match metric {
            Metric::WritingCost => self.writing_cost.is_some(),
            Metric::RetrievalCost => self.retrieval_cost.is_some(),
            Metric::StorageFee => self.storage_fee.is_some(),
            Metric::ExchangeRate => self.exchange_rate.is_some(),
            Metric::BlockTime => self.block_time.is_some(),
            Metric::TransactionThroughput => self.transaction_throughput.is_some(),
            Metric::MiningDistribution => self.mining_distribution.is_some(),
            Metric::NetworkHashrate => self.network_hashrate.is_some(),
            Metric::RequiredConfirmations => self.required_confirmations.is_some(),
            Metric::Reputation => self.reputation.is_some(),
        }
    }

    /// Raw (undamped) validity of a streaming sample.
    #[must_use]
    pub fn check(&self, sample: &MetricSample) -> bool {
        fn eval<T>(rule: Option<&ValidationRule<T>>, value: &T) -> bool {
            rule.map_or(true, |r| r.check(value))
        }

        match sample {
            MetricSample::WritingCost(v) => eval(self.writing_cost.as_ref(), v),
            MetricSample::RetrievalCost(v) => eval(self.retrieval_cost.as_ref(), v),
            MetricSample::StorageFee(v) => eval(self.storage_fee.as_ref(), v),
            MetricSample::ExchangeRate(v) => eval(self.exchange_rate.as_ref(), v),
            MetricSample::BlockTime(v) => eval(self.block_time.as_ref(), v),
            MetricSample::TransactionThroughput(v) => eval(self.transaction_throughput.as_ref(), v),
            MetricSample::MiningDistribution(v) => eval(self.mining_distribution.as_ref(), v),
            MetricSample::NetworkHashrate(v) => eval(self.network_hashrate.as_ref(), v),
        }
    }

    /// Grace period for a metric's violations; zero when unconfigured.
    #[must_use]
    pub fn grace(&self, metric: Metric) -> Duration {
        let grace = match metric {
            Metric::WritingCost => self.writing_cost.as_ref().map(ValidationRule::grace),
            Metric::RetrievalCost => self.retrieval_cost.as_ref().map(ValidationRule::grace),
            Metric::StorageFee => self.storage_fee.as_ref().map(ValidationRule::grace),
            Metric::ExchangeRate => self.exchange_rate.as_ref().map(ValidationRule::grace),
            Metric::BlockTime => self.block_time.as_ref().map(ValidationRule::grace),
            Metric::TransactionThroughput => {
                self.transaction_throughput.as_ref().map(ValidationRule::grace)
            }
            Metric::MiningDistribution => {
                self.mining_distribution.as_ref().map(ValidationRule::grace)
            }
            Metric::NetworkHashrate => self.network_hashrate.as_ref().map(ValidationRule::grace),
            Metric::RequiredConfirmations | Metric::Reputation => None,
        };
        grace.unwrap_or(Duration::ZERO)
    }

    #[must_use]
    pub fn check_confirmations(&self, confirmations: u32) -> bool {
        self.required_confirmations.as_ref().map_or(true, |r| r.check(&confirmations))
    }

    #[must_use]
    pub fn check_reputation(&self, reputation: u8) -> bool {
        self.reputation.as_ref().map_or(true, |r| r.check(&reputation))
    }

    /// Evaluates the disqualification predicate against a chain's validation result.
    #[must_use]
    pub fn is_disqualified(&self, result: &ValidationResult) -> bool {
        self.disqualify.as_ref().is_some_and(|f| f(result.as_array()))
    }
}
