use crate::types::{MetricSample, MiningDistribution};
use futures::{
    stream::{self, BoxStream, SelectAll},
    StreamExt,
};
use rust_decimal::Decimal;
use std::fmt;

/// Produces the eight continuous metric streams of one chain.
///
/// Called once per chain when the manager is built. Implementations typically spawn their own
/// polling tasks and hand back channel-backed streams; a stream that ends simply stops
/// contributing new samples.
pub trait MetricSource: Send + Sync {
    fn streams(&self) -> MetricStreams;
}

/// The eight metric streams of one chain.
pub struct MetricStreams {
    /// Cost of writing 1 KiB, in fiat.
    pub writing_cost: BoxStream<'static, Decimal>,
    /// Cost of reading 1 KiB, in fiat.
    pub retrieval_cost: BoxStream<'static, Decimal>,
    /// Storage fee per KiB, in fiat.
    pub storage_fee: BoxStream<'static, Decimal>,
    /// Price of the native coin, in fiat.
    pub exchange_rate: BoxStream<'static, Decimal>,
    /// Average block time, seconds.
    pub block_time: BoxStream<'static, f64>,
    /// Transactions per second.
    pub transaction_throughput: BoxStream<'static, f64>,
    pub mining_distribution: BoxStream<'static, MiningDistribution>,
    pub network_hashrate: BoxStream<'static, f64>,
}

impl MetricStreams {
    /// Streams that never produce a value and end immediately.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            writing_cost: stream::empty().boxed(),
            retrieval_cost: stream::empty().boxed(),
            storage_fee: stream::empty().boxed(),
            exchange_rate: stream::empty().boxed(),
            block_time: stream::empty().boxed(),
            transaction_throughput: stream::empty().boxed(),
            mining_distribution: stream::empty().boxed(),
            network_hashrate: stream::empty().boxed(),
        }
    }

    /// Merges the eight streams into one stream of tagged samples.
    ///
    /// Samples of one metric keep their arrival order; samples of different metrics interleave in
    /// whatever order they become ready.
    #[must_use]
    pub fn into_samples(self) -> SelectAll<BoxStream<'static, MetricSample>> {
        stream::select_all([
            self.writing_cost.map(MetricSample::WritingCost).boxed(),
            self.retrieval_cost.map(MetricSample::RetrievalCost).boxed(),
            self.storage_fee.map(MetricSample::StorageFee).boxed(),
            self.exchange_rate.map(MetricSample::ExchangeRate).boxed(),
            self.block_time.map(MetricSample::BlockTime).boxed(),
            self.transaction_throughput.map(MetricSample::TransactionThroughput).boxed(),
            self.mining_distribution.map(MetricSample::MiningDistribution).boxed(),
            self.network_hashrate.map(MetricSample::NetworkHashrate).boxed(),
        ])
    }
}

impl fmt::Debug for MetricStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricStreams").finish_non_exhaustive()
    }
}
