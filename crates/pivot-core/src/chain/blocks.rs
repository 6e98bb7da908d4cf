use crate::types::{Block, MiningDistribution};
use std::time::Duration;

/// Rate metrics derived from the blocks observed during a trailing window.
///
/// Feed it snapshots from an [`crate::stream::EvictionWindow`] over the same window. All rates
/// are per second of the full window, not of the span actually covered by the blocks. Every
/// method returns `None` for an empty snapshot.
#[derive(Debug, Clone, Copy)]
pub struct BlockStatistics {
    window_secs: f64,
}

impl BlockStatistics {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window_secs: window.as_secs_f64() }
    }

    /// Window length divided by the number of blocks (uncles excluded).
    #[must_use]
    pub fn average_block_time(&self, blocks: &[Block]) -> Option<f64> {
        if blocks.is_empty() {
            return None;
        }
        Some(self.window_secs / blocks.len() as f64)
    }

    /// Total transactions divided by the window length.
    #[must_use]
    pub fn transaction_throughput(&self, blocks: &[Block]) -> Option<f64> {
        if blocks.is_empty() || self.window_secs <= 0.0 {
            return None;
        }
        let transactions: u64 = blocks.iter().map(|b| u64::from(b.transaction_count)).sum();
        Some(transactions as f64 / self.window_secs)
    }

    /// Share of blocks (uncles included) produced by each miner, in percent.
    #[must_use]
    pub fn mining_distribution(&self, blocks: &[Block]) -> Option<MiningDistribution> {
        if blocks.is_empty() {
            return None;
        }

        let mut counts: MiningDistribution = MiningDistribution::new();
        let mut total = 0usize;
        for block in blocks.iter().flat_map(|b| std::iter::once(b).chain(b.uncles.iter())) {
            *counts.entry(block.miner.clone()).or_default() += 1.0;
            total += 1;
        }

        let total = total as f64;
        for share in counts.values_mut() {
            *share = 100.0 * *share / total;
        }
        Some(counts)
    }

    /// Sum of difficulties (uncles included) divided by the window length.
    #[must_use]
    pub fn network_hashrate(&self, blocks: &[Block]) -> Option<f64> {
        if blocks.is_empty() || self.window_secs <= 0.0 {
            return None;
        }
        let difficulty: f64 = blocks
            .iter()
            .map(|b| b.difficulty + b.uncles.iter().map(|u| u.difficulty).sum::<f64>())
            .sum();
        Some(difficulty / self.window_secs)
    }
}
