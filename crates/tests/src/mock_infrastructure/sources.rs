//! Hand-driven metric sources.

use futures::StreamExt;
use parking_lot::Mutex;
use pivot_core::{
    chain::{MetricSource, MetricStreams},
    types::{MetricSample, MiningDistribution},
};
use rust_decimal::Decimal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A [`MetricSource`] backed by one unbounded channel per metric.
///
/// The streams can be taken once; later calls to [`MetricSource::streams`] get streams that end
/// immediately. Values are pushed through the paired [`MetricFeed`].
pub struct ScriptedSource {
    streams: Mutex<Option<MetricStreams>>,
}

/// Sending half of a [`ScriptedSource`].
///
/// Dropping the feed ends all eight streams.
#[derive(Clone)]
pub struct MetricFeed {
    writing_cost: UnboundedSender<Decimal>,
    retrieval_cost: UnboundedSender<Decimal>,
    storage_fee: UnboundedSender<Decimal>,
    exchange_rate: UnboundedSender<Decimal>,
    block_time: UnboundedSender<f64>,
    transaction_throughput: UnboundedSender<f64>,
    mining_distribution: UnboundedSender<MiningDistribution>,
    network_hashrate: UnboundedSender<f64>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> (Self, MetricFeed) {
        let (writing_cost, writing_cost_rx) = unbounded_channel();
        let (retrieval_cost, retrieval_cost_rx) = unbounded_channel();
        let (storage_fee, storage_fee_rx) = unbounded_channel();
        let (exchange_rate, exchange_rate_rx) = unbounded_channel();
        let (block_time, block_time_rx) = unbounded_channel();
        let (transaction_throughput, transaction_throughput_rx) = unbounded_channel();
        let (mining_distribution, mining_distribution_rx) = unbounded_channel();
        let (network_hashrate, network_hashrate_rx) = unbounded_channel();

        let streams = MetricStreams {
            writing_cost: UnboundedReceiverStream::new(writing_cost_rx).boxed(),
            retrieval_cost: UnboundedReceiverStream::new(retrieval_cost_rx).boxed(),
            storage_fee: UnboundedReceiverStream::new(storage_fee_rx).boxed(),
            exchange_rate: UnboundedReceiverStream::new(exchange_rate_rx).boxed(),
            block_time: UnboundedReceiverStream::new(block_time_rx).boxed(),
            transaction_throughput: UnboundedReceiverStream::new(transaction_throughput_rx)
                .boxed(),
            mining_distribution: UnboundedReceiverStream::new(mining_distribution_rx).boxed(),
            network_hashrate: UnboundedReceiverStream::new(network_hashrate_rx).boxed(),
        };

        let feed = MetricFeed {
            writing_cost,
            retrieval_cost,
            storage_fee,
            exchange_rate,
            block_time,
            transaction_throughput,
            mining_distribution,
            network_hashrate,
        };

        (Self { streams: Mutex::new(Some(streams)) }, feed)
    }
}

impl MetricSource for ScriptedSource {
    fn streams(&self) -> MetricStreams {
        self.streams.lock().take().unwrap_or_else(MetricStreams::empty)
    }
}

impl MetricFeed {
    /// Pushes one sample onto its metric's stream. Returns `false` if the pipeline is gone.
    pub fn send(&self, sample: MetricSample) -> bool {
        match sample {
            MetricSample::WritingCost(v) => self.writing_cost.send(v).is_ok(),
            MetricSample::RetrievalCost(v) => self.retrieval_cost.send(v).is_ok(),
            MetricSample::StorageFee(v) => self.storage_fee.send(v).is_ok(),
            MetricSample::ExchangeRate(v) => self.exchange_rate.send(v).is_ok(),
            MetricSample::BlockTime(v) => self.block_time.send(v).is_ok(),
            MetricSample::TransactionThroughput(v) => self.transaction_throughput.send(v).is_ok(),
            MetricSample::MiningDistribution(v) => self.mining_distribution.send(v).is_ok(),
            MetricSample::NetworkHashrate(v) => self.network_hashrate.send(v).is_ok(),
        }
    }

    /// Pushes every sample in order. Returns `false` if any of them could not be delivered.
    pub fn send_all(&self, samples: impl IntoIterator<Item = MetricSample>) -> bool {
        samples.into_iter().fold(true, |delivered, sample| self.send(sample) && delivered)
    }
}
