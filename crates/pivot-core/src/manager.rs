//! Top-level handle tying pipelines, the advisor and the executor together.

use crate::{
    advisor::{CurrentChain, SwitchoverAdvisor},
    builder::SwitchoverManagerBuilder,
    chain::{ChainDescriptor, ChainPipeline, ResultSink},
    errors::{LedgerError, SwitchoverError},
    executor::{Phase, SwitchoverExecutor},
    settings::{RankingSettings, ValidationSettings},
    types::{CalculationResult, ChainId, SwitchoverSuggestion},
};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::{future, stream::BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

/// Owns the background tasks of a running switchover system.
///
/// Suggestions and per-chain results are computed once and cached; every subscriber shares the
/// same computation and a late subscriber immediately receives the latest value.
pub struct SwitchoverManager {
    chains: Vec<Arc<ChainDescriptor>>,
    executor: SwitchoverExecutor,
    suggestions: watch::Receiver<Option<SwitchoverSuggestion>>,
    results: DashMap<ChainId, watch::Receiver<Option<CalculationResult>>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_initiated: AtomicBool,
}

impl SwitchoverManager {
    #[must_use]
    pub fn builder() -> SwitchoverManagerBuilder {
        SwitchoverManagerBuilder::new()
    }

    /// Spawns one pipeline per chain plus the advisor. Called by [`SwitchoverManagerBuilder`].
    pub(crate) fn start(
        chains: Vec<Arc<ChainDescriptor>>,
        initial: Arc<ChainDescriptor>,
        ranking: Arc<RankingSettings>,
        validation: Arc<ValidationSettings>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let current: CurrentChain = Arc::new(ArcSwap::new(initial));
        let (advisor_tx, advisor_rx) = mpsc::unbounded_channel();

        let results = DashMap::with_capacity(chains.len());
        let mut tasks = Vec::with_capacity(chains.len() + 1);
        for (index, chain) in chains.iter().enumerate() {
            let (latest, latest_rx) = watch::channel(None);
            results.insert(chain.id().clone(), latest_rx);

            let sink = ResultSink { index, advisor: advisor_tx.clone(), latest };
            let pipeline = ChainPipeline::new(
                Arc::clone(chain),
                Arc::clone(&ranking),
                Arc::clone(&validation),
            );
            tasks.push(pipeline.spawn(sink, shutdown_tx.subscribe()));
            debug!(chain = %chain.id(), index, "chain pipeline started");
        }
        drop(advisor_tx);

        let (publisher, suggestions) = watch::channel(None);
        let advisor = SwitchoverAdvisor::new(
            validation,
            ranking.min_suggestion_interval(),
            Arc::clone(&current),
            chains.len(),
        );
        tasks.push(advisor.spawn(advisor_rx, publisher, shutdown_tx.subscribe()));

        info!(
            chains = chains.len(),
            current = %current.load().id(),
            "switchover manager started"
        );

        Self {
            chains,
            executor: SwitchoverExecutor::new(current),
            suggestions,
            results,
            shutdown_tx,
            tasks: Mutex::new(tasks),
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// Registered chains in registration order.
    #[must_use]
    pub fn chains(&self) -> &[Arc<ChainDescriptor>] {
        &self.chains
    }

    #[must_use]
    pub fn chain(&self, id: &ChainId) -> Option<Arc<ChainDescriptor>> {
        self.chains.iter().find(|c| c.id() == id).cloned()
    }

    /// The chain writes currently go to.
    #[must_use]
    pub fn current_chain(&self) -> Arc<ChainDescriptor> {
        self.executor.current_chain()
    }

    #[must_use]
    pub fn executor(&self) -> &SwitchoverExecutor {
        &self.executor
    }

    /// Stream of switchover suggestions.
    ///
    /// Starts with the latest suggestion, if any was made. A subscriber that falls behind only
    /// sees the most recent suggestion.
    #[must_use]
    pub fn suggestions(&self) -> BoxStream<'static, SwitchoverSuggestion> {
        WatchStream::new(self.suggestions.clone()).filter_map(future::ready).boxed()
    }

    #[must_use]
    pub fn latest_suggestion(&self) -> Option<SwitchoverSuggestion> {
        self.suggestions.borrow().clone()
    }

    /// Stream of calculation results for one chain, or `None` if the chain is not registered.
    #[must_use]
    pub fn calculation_results(
        &self,
        id: &ChainId,
    ) -> Option<BoxStream<'static, CalculationResult>> {
        let rx = self.results.get(id)?.clone();
        Some(WatchStream::new(rx).filter_map(future::ready).boxed())
    }

    #[must_use]
    pub fn latest_result(&self, id: &ChainId) -> Option<CalculationResult> {
        self.results.get(id).and_then(|rx| rx.borrow().clone())
    }

    /// Writes `payload` to the current chain, buffering it while a switchover is in progress.
    ///
    /// # Errors
    ///
    /// Returns the current chain's ledger error unchanged.
    pub async fn write_data(&self, payload: impl Into<String>) -> Result<(), LedgerError> {
        self.executor.write_data(payload).await
    }

    /// Switches writes over to the chain `next`, migrating entries written between `from` and
    /// `to`.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchoverError::UnknownChain`] if `next` is not registered, otherwise whatever
    /// [`SwitchoverExecutor::switch_over`] reports.
    pub async fn switch_over(
        &self,
        next: &ChainId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), SwitchoverError> {
        let chain = self.chain(next).ok_or_else(|| SwitchoverError::UnknownChain(next.clone()))?;
        self.executor.switch_over(chain, from, to).await
    }

    /// Acts on a suggestion by switching to its next chain.
    ///
    /// # Errors
    ///
    /// See [`switch_over`](Self::switch_over).
    pub async fn apply(
        &self,
        suggestion: &SwitchoverSuggestion,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), SwitchoverError> {
        self.switch_over(suggestion.next_chain(), from, to).await
    }

    pub async fn phase(&self) -> Phase {
        self.executor.phase().await
    }

    pub async fn buffered_len(&self) -> usize {
        self.executor.buffered_len().await
    }

    /// Creates a new shutdown receiver for custom tasks that should stop with the manager.
    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Stops every pipeline and the advisor and waits for them to finish.
    ///
    /// Idempotent; later calls return immediately. Streams obtained earlier end once their
    /// producers stop.
    pub async fn shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Shutdown already initiated, ignoring duplicate call");
            return;
        }

        info!("Initiating switchover manager shutdown");
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!(error = %e, "no running tasks to signal");
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => debug!("background task cancelled"),
                Err(e) => error!(error = %e, "background task failed"),
            }
        }

        info!("Switchover manager shutdown complete");
    }
}

impl Drop for SwitchoverManager {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SwitchoverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchoverManager")
            .field("chains", &self.chains.iter().map(|c| c.id()).collect::<Vec<_>>())
            .field("current", self.executor.current_chain().id())
            .field("shutdown", &self.shutdown_initiated.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
