//! Core data model shared by every component of the control loop.
//!
//! The metric set is closed: [`Metric::ALL`] lists the ten metrics in the fixed order used for
//! scoring maps, validation maps and the disqualification predicate.

use crate::chain::ChainDescriptor;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};

/// Address → share of mined blocks (percent) over the observation window.
pub type MiningDistribution = HashMap<String, f64>;

/// One of the ten dimensions used to compare chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WritingCost,
    RetrievalCost,
    StorageFee,
    ExchangeRate,
    BlockTime,
    TransactionThroughput,
    MiningDistribution,
    NetworkHashrate,
    RequiredConfirmations,
    Reputation,
}

impl Metric {
    /// All metrics in the fixed evaluation order.
    pub const ALL: [Metric; 10] = [
        Metric::WritingCost,
        Metric::RetrievalCost,
        Metric::StorageFee,
        Metric::ExchangeRate,
        Metric::BlockTime,
        Metric::TransactionThroughput,
        Metric::MiningDistribution,
        Metric::NetworkHashrate,
        Metric::RequiredConfirmations,
        Metric::Reputation,
    ];

    /// Metrics delivered as continuous streams by a [`crate::chain::MetricSource`].
    pub const STREAMING: [Metric; 8] = [
        Metric::WritingCost,
        Metric::RetrievalCost,
        Metric::StorageFee,
        Metric::ExchangeRate,
        Metric::BlockTime,
        Metric::TransactionThroughput,
        Metric::MiningDistribution,
        Metric::NetworkHashrate,
    ];

    /// Position of this metric in [`Metric::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for the two metrics taken from the chain descriptor instead of a stream.
    #[must_use]
    pub fn is_static(self) -> bool {
        matches!(self, Metric::RequiredConfirmations | Metric::Reputation)
    }

    /// Returns a static label for logs and configuration keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::WritingCost => "writing_cost",
            Metric::RetrievalCost => "retrieval_cost",
            Metric::StorageFee => "storage_fee",
            Metric::ExchangeRate => "exchange_rate",
            Metric::BlockTime => "block_time",
            Metric::TransactionThroughput => "transaction_throughput",
            Metric::MiningDistribution => "mining_distribution",
            Metric::NetworkHashrate => "network_hashrate",
            Metric::RequiredConfirmations => "required_confirmations",
            Metric::Reputation => "reputation",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique chain identifier. Equality and registry membership are keyed solely on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(Arc<str>);

impl ChainId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChainId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Serialize for ChainId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// A single value pulled from one of the eight metric streams.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSample {
    WritingCost(Decimal),
    RetrievalCost(Decimal),
    StorageFee(Decimal),
    ExchangeRate(Decimal),
    BlockTime(f64),
    TransactionThroughput(f64),
    MiningDistribution(MiningDistribution),
    NetworkHashrate(f64),
}

impl MetricSample {
    #[must_use]
    pub fn metric(&self) -> Metric {
        match self {
            MetricSample::WritingCost(_) => Metric::WritingCost,
            MetricSample::RetrievalCost(_) => Metric::RetrievalCost,
            MetricSample::StorageFee(_) => Metric::StorageFee,
            MetricSample::ExchangeRate(_) => Metric::ExchangeRate,
            MetricSample::BlockTime(_) => Metric::BlockTime,
            MetricSample::TransactionThroughput(_) => Metric::TransactionThroughput,
            MetricSample::MiningDistribution(_) => Metric::MiningDistribution,
            MetricSample::NetworkHashrate(_) => Metric::NetworkHashrate,
        }
    }
}

/// The latest value of every streaming metric for one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReadings {
    pub writing_cost: Decimal,
    pub retrieval_cost: Decimal,
    pub storage_fee: Decimal,
    pub exchange_rate: Decimal,
    pub block_time: f64,
    pub transaction_throughput: f64,
    pub mining_distribution: MiningDistribution,
    pub network_hashrate: f64,
}

impl MetricReadings {
    /// Assembles readings from a complete set of samples.
    ///
    /// Returns `None` if any streaming metric is missing. Later samples for the same metric
    /// replace earlier ones.
    #[must_use]
    pub fn from_samples<I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = MetricSample>,
    {
        let mut writing_cost = None;
        let mut retrieval_cost = None;
        let mut storage_fee = None;
        let mut exchange_rate = None;
        let mut block_time = None;
        let mut transaction_throughput = None;
        let mut mining_distribution = None;
        let mut network_hashrate = None;

        for sample in samples {
            match sample {
                MetricSample::WritingCost(v) => writing_cost = Some(v),
                MetricSample::RetrievalCost(v) => retrieval_cost = Some(v),
                MetricSample::StorageFee(v) => storage_fee = Some(v),
                MetricSample::ExchangeRate(v) => exchange_rate = Some(v),
                MetricSample::BlockTime(v) => block_time = Some(v),
                MetricSample::TransactionThroughput(v) => transaction_throughput = Some(v),
                MetricSample::MiningDistribution(v) => mining_distribution = Some(v),
                MetricSample::NetworkHashrate(v) => network_hashrate = Some(v),
            }
        }

        Some(Self {
            writing_cost: writing_cost?,
            retrieval_cost: retrieval_cost?,
            storage_fee: storage_fee?,
            exchange_rate: exchange_rate?,
            block_time: block_time?,
            transaction_throughput: transaction_throughput?,
            mining_distribution: mining_distribution?,
            network_hashrate: network_hashrate?,
        })
    }
}

/// Weighted value (score × weight) for each metric of one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedScore {
    chain: ChainId,
    values: [i64; 10],
}

impl WeightedScore {
    #[must_use]
    pub fn new(chain: ChainId, values: [i64; 10]) -> Self {
        Self { chain, values }
    }

    #[must_use]
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    #[must_use]
    pub fn get(&self, metric: Metric) -> i64 {
        self.values[metric.index()]
    }

    /// Integer sum of all ten weighted values, saturating at the `i64` bounds.
    #[must_use]
    pub fn overall(&self) -> i64 {
        self.values.iter().fold(0i64, |acc, v| acc.saturating_add(*v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, i64)> + '_ {
        Metric::ALL.iter().map(|m| (*m, self.values[m.index()]))
    }
}

/// Per-metric pass/fail map for one chain at one evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    passes: [bool; 10],
}

impl ValidationResult {
    #[must_use]
    pub fn new(passes: [bool; 10]) -> Self {
        Self { passes }
    }

    /// A result in which every metric passes.
    #[must_use]
    pub fn all_passing() -> Self {
        Self { passes: [true; 10] }
    }

    #[must_use]
    pub fn passes(&self, metric: Metric) -> bool {
        self.passes[metric.index()]
    }

    /// The ten booleans in [`Metric::ALL`] order.
    #[must_use]
    pub fn as_array(&self) -> &[bool; 10] {
        &self.passes
    }

    /// Metrics currently failing their threshold.
    #[must_use]
    pub fn failing(&self) -> Vec<Metric> {
        Metric::ALL.iter().copied().filter(|m| !self.passes[m.index()]).collect()
    }
}

/// The unit compared across chains by the advisor.
#[derive(Debug, Clone)]
pub struct CalculationResult {
    pub chain: Arc<ChainDescriptor>,
    pub score: WeightedScore,
    pub validation: ValidationResult,
    pub computed_at: DateTime<Utc>,
}

impl CalculationResult {
    #[must_use]
    pub fn chain_id(&self) -> &ChainId {
        self.chain.id()
    }

    #[must_use]
    pub fn overall_score(&self) -> i64 {
        self.score.overall()
    }
}

impl PartialEq for CalculationResult {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id() == other.chain_id() &&
            self.score == other.score &&
            self.validation == other.validation &&
            self.computed_at == other.computed_at
    }
}

/// Proposal to move the write target from the current chain to `next`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchoverSuggestion {
    pub current: CalculationResult,
    pub next: CalculationResult,
}

impl SwitchoverSuggestion {
    #[must_use]
    pub fn next_chain(&self) -> &ChainId {
        self.next.chain_id()
    }

    #[must_use]
    pub fn current_chain(&self) -> &ChainId {
        self.current.chain_id()
    }

    /// Score improvement the switch would bring. May be negative when the current chain is
    /// disqualified and the best eligible chain scores lower.
    #[must_use]
    pub fn score_gain(&self) -> i64 {
        self.next.overall_score().saturating_sub(self.current.overall_score())
    }
}

/// A block observed on a chain, as reported by a metric source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub transaction_count: u32,
    pub miner: String,
    pub difficulty: f64,
    #[serde(default)]
    pub uncles: Vec<Block>,
}
