//! Switchover advisor: cross-chain selection, dedup, throttling and publishing.
//!
//! The advisor joins the latest [`CalculationResult`] of every registered chain. Each time any of
//! them changes it:
//!
//! 1. drops chains whose validation result trips the disqualification predicate,
//! 2. picks the eligible chain with the greatest overall score (earliest registered wins ties),
//! 3. ignores the pick if it names the same chain as the previous pick,
//! 4. suppresses it if it names the current chain,
//! 5. throttles emissions: after one, the next waits for the minimum interval and the latest
//!    candidate raised in between is emitted at the window boundary.
//!
//! Suggestions are published through a `watch` channel, so there is exactly one computation no
//! matter how many subscribers there are, and a late subscriber immediately sees the latest
//! suggestion.

use crate::{
    chain::ChainDescriptor,
    settings::ValidationSettings,
    stream::LatestJoin,
    types::{CalculationResult, ChainId, SwitchoverSuggestion},
};
use arc_swap::ArcSwap;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info};

/// Shared cell holding the chain writes currently go to.
pub type CurrentChain = Arc<ArcSwap<ChainDescriptor>>;

/// Picks the best eligible chain among `results`.
///
/// Returns `None` if no chain is eligible or `current` has no result. The returned suggestion may
/// name `current` as the next chain; callers decide whether that is worth reporting.
///
/// Ties go to the earliest entry in `results`, i.e. the earliest registered chain, not the last.
#[must_use]
pub fn select_suggestion(
    results: &[CalculationResult],
    current: &ChainId,
    validation: &ValidationSettings,
) -> Option<SwitchoverSuggestion> {
    let current_result = results.iter().find(|r| r.chain_id() == current)?;

    let mut best: Option<&CalculationResult> = None;
    for result in results {
        if validation.is_disqualified(&result.validation) {
            continue;
        }
        if best.map_or(true, |b| result.overall_score() > b.overall_score()) {
            best = Some(result);
        }
    }

    best.map(|next| SwitchoverSuggestion { current: current_result.clone(), next: next.clone() })
}

/// Stateful half of the advisor: joins per-chain results and applies selection, dedup and
/// no-op suppression. Throttling happens in the spawned task.
#[derive(Debug)]
pub struct SwitchoverAdvisor {
    validation: Arc<ValidationSettings>,
    min_interval: Duration,
    current: CurrentChain,
    results: LatestJoin<CalculationResult>,
    last_pick: Option<ChainId>,
}

impl SwitchoverAdvisor {
    #[must_use]
    pub fn new(
        validation: Arc<ValidationSettings>,
        min_interval: Duration,
        current: CurrentChain,
        chain_count: usize,
    ) -> Self {
        Self {
            validation,
            min_interval,
            current,
            results: LatestJoin::new(chain_count),
            last_pick: None,
        }
    }

    /// Records the latest result of the chain registered at `index` and re-evaluates.
    ///
    /// Returns a suggestion only when the best eligible chain changed and is not the current
    /// chain.
    pub fn on_result(
        &mut self,
        index: usize,
        result: CalculationResult,
    ) -> Option<SwitchoverSuggestion> {
        if !self.results.update(index, result) {
            return None;
        }
        let results = self.results.snapshot()?;
        let current = self.current.load();
        let suggestion = select_suggestion(&results, current.id(), &self.validation)?;

        let next = suggestion.next_chain();
        if self.last_pick.as_ref() == Some(next) {
            return None;
        }
        self.last_pick = Some(next.clone());

        if next == current.id() {
            debug!(chain = %next, "best eligible chain is already current");
            return None;
        }
        Some(suggestion)
    }

    /// Returns `true` if the latest pick names the chain writes currently go to.
    fn pick_is_current(&self) -> bool {
        self.last_pick.as_ref() == Some(self.current.load().id())
    }

    /// Spawns the advisor task, publishing throttled suggestions into `publisher`.
    pub fn spawn(
        mut self,
        mut results_rx: mpsc::UnboundedReceiver<(usize, CalculationResult)>,
        publisher: watch::Sender<Option<SwitchoverSuggestion>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut window_end: Option<Instant> = None;
            let mut pending: Option<SwitchoverSuggestion> = None;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("switchover advisor shutting down");
                        break;
                    }
                    message = results_rx.recv() => {
                        let Some((index, result)) = message else {
                            debug!("all chain pipelines ended");
                            break;
                        };
                        let Some(suggestion) = self.on_result(index, result) else {
                            if pending.is_some() && self.pick_is_current() {
                                debug!("deferred suggestion withdrawn, current chain is best");
                                pending = None;
                            }
                            continue;
                        };
                        if window_end.is_some() {
                            debug!(next = %suggestion.next_chain(), "suggestion deferred by throttle");
                            pending = Some(suggestion);
                        } else {
                            window_end = self.emit(&publisher, suggestion);
                        }
                    }
                    () = sleep_until(window_end.unwrap_or_else(Instant::now)), if window_end.is_some() => {
                        window_end = match pending.take() {
                            Some(suggestion) => self.emit(&publisher, suggestion),
                            None => None,
                        };
                    }
                }
            }
        })
    }

    /// Publishes a suggestion and returns the end of the throttle window it opens.
    fn emit(
        &self,
        publisher: &watch::Sender<Option<SwitchoverSuggestion>>,
        suggestion: SwitchoverSuggestion,
    ) -> Option<Instant> {
        info!(
            current = %suggestion.current_chain(),
            next = %suggestion.next_chain(),
            current_score = suggestion.current.overall_score(),
            next_score = suggestion.next.overall_score(),
            "switchover suggested"
        );
        publisher.send_replace(Some(suggestion));
        (!self.min_interval.is_zero()).then(|| Instant::now() + self.min_interval)
    }
}
