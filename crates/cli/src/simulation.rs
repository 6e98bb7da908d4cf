//! Simulated chains for the demo: random-walk metric sources and in-memory ledgers.

use chrono::{TimeDelta, Utc};
use pivot_core::{
    chain::{BlockStatistics, ChainDescriptor, InMemoryLedger, MetricSource, MetricStreams},
    config::{ChainConfig, SimulationConfig},
    settings::SettingsError,
    stream::EvictionWindow,
    types::Block,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

/// Upper bound on the number of historical blocks seeded into the window.
const MAX_SEEDED_BLOCKS: usize = 20_000;

const BASE_DIFFICULTY: f64 = 1.0e12;

/// Random-walk parameter: moves by at most `volatility` (relative) per step and never goes
/// below `floor`.
#[derive(Debug, Clone, Copy)]
struct Walk {
    value: f64,
    volatility: f64,
    floor: f64,
}

impl Walk {
    fn new(value: f64, volatility: f64) -> Self {
        Self { value, volatility, floor: value.abs() * 0.05 }
    }

    fn step(&mut self, rng: &mut impl Rng) -> f64 {
        if self.volatility > 0.0 {
            let factor = 1.0 + rng.random_range(-self.volatility..=self.volatility);
            self.value = (self.value * factor).max(self.floor);
        }
        self.value
    }
}

fn decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default().round_dp(6)
}

/// [`MetricSource`] producing random-walk costs and synthetic blocks.
///
/// Block-derived metrics go through an [`EvictionWindow`] and [`BlockStatistics`], exactly as a
/// real chain adapter would. The window is seeded with one window's worth of history so rates
/// are meaningful from the first snapshot.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    chain: String,
    params: SimulationConfig,
    window: EvictionWindow,
    seed: u64,
}

impl SimulatedSource {
    #[must_use]
    pub fn new(chain: &str, params: SimulationConfig, window: EvictionWindow, seed: u64) -> Self {
        Self { chain: chain.to_string(), params, window, seed }
    }

    fn update_interval(&self) -> Duration {
        Duration::from_millis(self.params.update_interval_ms.max(1))
    }

    fn miner(&self, rng: &mut impl Rng) -> String {
        format!("{}-miner-{}", self.chain, rng.random_range(0..self.params.miners.max(1)))
    }

    fn block(&self, rng: &mut impl Rng, height: u64, timestamp: chrono::DateTime<Utc>) -> Block {
        let transactions =
            f64::from(self.params.transactions_per_block) * rng.random_range(0.5..1.5);
        let uncles = if rng.random_bool(0.05) {
            vec![Block {
                hash: format!("{}-uncle-{height}", self.chain),
                height,
                timestamp,
                transaction_count: 0,
                miner: self.miner(rng),
                difficulty: BASE_DIFFICULTY * rng.random_range(0.9..1.1),
                uncles: Vec::new(),
            }]
        } else {
            Vec::new()
        };
        Block {
            hash: format!("{}-{height}", self.chain),
            height,
            timestamp,
            transaction_count: transactions as u32,
            miner: self.miner(rng),
            difficulty: BASE_DIFFICULTY * rng.random_range(0.9..1.1),
            uncles,
        }
    }

    /// One window of past blocks, oldest first.
    fn history(&self, rng: &mut impl Rng) -> Vec<Block> {
        let interval = self.params.block_interval_seconds.max(0.001);
        let span = self.window.window().as_secs_f64();
        let count = ((span / interval) as usize).min(MAX_SEEDED_BLOCKS);

        let now = Utc::now();
        (0..count)
            .rev()
            .map(|age| {
                let offset = TimeDelta::milliseconds((age as f64 * interval * 1000.0) as i64);
                self.block(rng, (count - age) as u64, now - offset)
            })
            .collect()
    }
}

impl MetricSource for SimulatedSource {
    fn streams(&self) -> MetricStreams {
        let (writing_tx, writing_rx) = mpsc::unbounded_channel();
        let (retrieval_tx, retrieval_rx) = mpsc::unbounded_channel();
        let (storage_tx, storage_rx) = mpsc::unbounded_channel();
        let (rate_tx, rate_rx) = mpsc::unbounded_channel();
        let (block_time_tx, block_time_rx) = mpsc::unbounded_channel();
        let (throughput_tx, throughput_rx) = mpsc::unbounded_channel();
        let (mining_tx, mining_rx) = mpsc::unbounded_channel();
        let (hashrate_tx, hashrate_rx) = mpsc::unbounded_channel();

        let volatility = self.params.volatility.max(0.0);
        let period = self.update_interval();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut costs = [
            Walk::new(self.params.writing_cost, volatility),
            Walk::new(self.params.retrieval_cost, volatility),
            Walk::new(self.params.storage_fee, volatility),
            Walk::new(self.params.exchange_rate, volatility),
        ];
        let chain = self.chain.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let [writing, retrieval, storage, rate] = &mut costs;
                let sent = writing_tx.send(decimal(writing.step(&mut rng))).is_ok() |
                    retrieval_tx.send(decimal(retrieval.step(&mut rng))).is_ok() |
                    storage_tx.send(decimal(storage.step(&mut rng))).is_ok() |
                    rate_tx.send(decimal(rate.step(&mut rng))).is_ok();
                if !sent {
                    debug!(chain = %chain, "cost simulation stopped");
                    break;
                }
            }
        });

        let source = self.clone();
        let statistics = BlockStatistics::new(self.window.window());
        tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(source.seed.wrapping_add(1));
            let (blocks_tx, blocks_rx) = mpsc::unbounded_channel();
            let mut snapshots =
                source.window.clone().attach(UnboundedReceiverStream::new(blocks_rx));

            let history = source.history(&mut rng);
            let mut height = history.len() as u64;
            for block in history {
                let _ = blocks_tx.send(block);
            }

            let mut interval =
                Walk::new(source.params.block_interval_seconds.max(0.001), volatility);
            let mut next_block = tokio::time::Instant::now() +
                Duration::from_secs_f64(interval.step(&mut rng));

            loop {
                tokio::select! {
                    () = tokio::time::sleep_until(next_block) => {
                        height += 1;
                        let _ = blocks_tx.send(source.block(&mut rng, height, Utc::now()));
                        next_block += Duration::from_secs_f64(interval.step(&mut rng));
                        trace!(chain = %source.chain, height, "simulated block");
                    }
                    snapshot = futures::StreamExt::next(&mut snapshots) => {
                        let Some(blocks) = snapshot else { break };
                        if let Some(v) = statistics.average_block_time(&blocks) {
                            let _ = block_time_tx.send(v);
                        }
                        if let Some(v) = statistics.transaction_throughput(&blocks) {
                            let _ = throughput_tx.send(v);
                        }
                        if let Some(v) = statistics.mining_distribution(&blocks) {
                            let _ = mining_tx.send(v);
                        }
                        if let Some(v) = statistics.network_hashrate(&blocks) {
                            let _ = hashrate_tx.send(v);
                        }
                        if block_time_tx.is_closed() &&
                            throughput_tx.is_closed() &&
                            mining_tx.is_closed() &&
                            hashrate_tx.is_closed()
                        {
                            debug!(chain = %source.chain, "block simulation stopped");
                            break;
                        }
                    }
                }
            }
        });

        MetricStreams {
            writing_cost: Box::pin(UnboundedReceiverStream::new(writing_rx)),
            retrieval_cost: Box::pin(UnboundedReceiverStream::new(retrieval_rx)),
            storage_fee: Box::pin(UnboundedReceiverStream::new(storage_rx)),
            exchange_rate: Box::pin(UnboundedReceiverStream::new(rate_rx)),
            block_time: Box::pin(UnboundedReceiverStream::new(block_time_rx)),
            transaction_throughput: Box::pin(UnboundedReceiverStream::new(throughput_rx)),
            mining_distribution: Box::pin(UnboundedReceiverStream::new(mining_rx)),
            network_hashrate: Box::pin(UnboundedReceiverStream::new(hashrate_rx)),
        }
    }
}

/// Builds the descriptor of one configured chain with a simulated source and an in-memory
/// ledger.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidReputation`] if the configured reputation is out of range.
pub fn simulated_chain(
    config: &ChainConfig,
    window: EvictionWindow,
    seed: u64,
) -> Result<ChainDescriptor, SettingsError> {
    let source = SimulatedSource::new(&config.id, config.simulation.clone(), window, seed);
    let mut ledger = InMemoryLedger::new(config.id.as_str());
    if config.simulation.max_payload_len > 0 {
        ledger = ledger.with_payload_limit(
            config.simulation.max_payload_len,
            pivot_core::chain::PayloadFormatter::chunked(),
        );
    }
    ChainDescriptor::new(
        config.id.as_str(),
        Arc::new(source),
        Arc::new(ledger),
        config.required_confirmations,
        config.reputation,
    )
}
