//! Per-chain scoring and validation task.

use super::ChainDescriptor;
use crate::{
    scoring::ScoringEngine,
    settings::{RankingSettings, ValidationSettings},
    stream::LatestJoin,
    types::{CalculationResult, Metric, MetricReadings, MetricSample},
    validation::ValidationAggregator,
};
use chrono::Utc;
use futures::{stream::SelectAll, StreamExt};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

/// Where a pipeline publishes its [`CalculationResult`]s.
#[derive(Debug)]
pub struct ResultSink {
    /// Registration index of the chain, forwarded to the advisor with every result.
    pub index: usize,
    pub advisor: mpsc::UnboundedSender<(usize, CalculationResult)>,
    pub latest: watch::Sender<Option<CalculationResult>>,
}

impl ResultSink {
    fn publish(&self, result: CalculationResult) {
        self.latest.send_replace(Some(result.clone()));
        let _ = self.advisor.send((self.index, result));
    }
}

/// Turns one chain's metric streams into a stream of [`CalculationResult`]s.
///
/// Every raw sample is checked against its validation rule and fed to that metric's hysteresis
/// gate. Scoring only reacts to samples that differ from the metric's previous value. A new
/// result is published whenever the weighted score or the damped validation changes, once every
/// streaming metric has reported at least once.
#[derive(Debug)]
pub struct ChainPipeline {
    chain: Arc<ChainDescriptor>,
    scoring: ScoringEngine,
    validation: ValidationAggregator,
    samples: LatestJoin<MetricSample>,
}

impl ChainPipeline {
    #[must_use]
    pub fn new(
        chain: Arc<ChainDescriptor>,
        ranking: Arc<RankingSettings>,
        validation: Arc<ValidationSettings>,
    ) -> Self {
        Self {
            chain,
            scoring: ScoringEngine::new(ranking),
            validation: ValidationAggregator::new(validation),
            samples: LatestJoin::new(Metric::STREAMING.len()),
        }
    }

    #[must_use]
    pub fn chain(&self) -> &Arc<ChainDescriptor> {
        &self.chain
    }

    /// Spawns the pipeline task.
    ///
    /// The task runs until every metric stream and gate has ended or a shutdown signal arrives.
    pub fn spawn(
        mut self,
        sink: ResultSink,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let chain_id = self.chain.id().clone();
            let mut samples = self.chain.source().streams().into_samples();

            let mut gate_inputs = Vec::with_capacity(Metric::STREAMING.len());
            let mut gate_outputs = SelectAll::new();
            for metric in Metric::STREAMING {
                let (tx, rx) = mpsc::unbounded_channel();
                let gated =
                    self.validation.gate_for(metric).attach(UnboundedReceiverStream::new(rx));
                gate_outputs.push(gated.map(move |passes| (metric, passes)).boxed());
                gate_inputs.push(tx);
            }

            debug!(chain = %chain_id, "chain pipeline started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(chain = %chain_id, "chain pipeline shutting down");
                        break;
                    }
                    sample = samples.next(), if !gate_inputs.is_empty() => match sample {
                        Some(sample) => {
                            if self.on_sample(&gate_inputs, sample) {
                                self.publish(&sink);
                            }
                        }
                        None => {
                            debug!(chain = %chain_id, "metric streams ended");
                            gate_inputs.clear();
                        }
                    },
                    gate = gate_outputs.next() => match gate {
                        Some((metric, passes)) => {
                            if self.validation.record(metric, passes) {
                                debug!(chain = %chain_id, metric = %metric, passes, "validity changed");
                                self.publish(&sink);
                            }
                        }
                        None => break,
                    },
                }
            }
        })
    }

    /// Routes a raw sample to its gate and the scoring join. Returns `true` if the score inputs
    /// changed.
    fn on_sample(
        &mut self,
        gate_inputs: &[mpsc::UnboundedSender<bool>],
        sample: MetricSample,
    ) -> bool {
        let metric = sample.metric();
        let within_range = self.validation.settings().check(&sample);
        if let Some(gate) = gate_inputs.get(metric.index()) {
            let _ = gate.send(within_range);
        }
        self.samples.update(metric.index(), sample)
    }

    /// Builds the current result, if every input has reported.
    #[must_use]
    pub fn current_result(&self) -> Option<CalculationResult> {
        let readings = MetricReadings::from_samples(self.samples.snapshot()?)?;
        let confirmations = self.chain.required_confirmations();
        let reputation = self.chain.reputation();

        let validation = self.validation.result(confirmations, reputation)?;
        let score = self.scoring.score(self.chain.id(), &readings, confirmations, reputation);

        Some(CalculationResult {
            chain: Arc::clone(&self.chain),
            score,
            validation,
            computed_at: Utc::now(),
        })
    }

    fn publish(&self, sink: &ResultSink) {
        let Some(result) = self.current_result() else {
            return;
        };
        debug!(
            chain = %self.chain.id(),
            score = result.overall_score(),
            failing = ?result.validation.failing(),
            "calculation result updated"
        );
        sink.publish(result);
    }
}
