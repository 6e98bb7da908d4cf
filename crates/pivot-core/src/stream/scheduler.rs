//! Owned background timers.
//!
//! A [`ScheduledTask`] wraps a spawned tokio task running either a one-shot delayed callback or a
//! periodic callback. The owning component holds the handle; dropping it aborts the timer.

use std::time::Duration;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

/// Handle to a one-shot or periodic timer running on the tokio runtime.
///
/// Cancellation happens at most once: the first [`cancel`](Self::cancel) aborts the task and
/// returns `true`, later calls are no-ops returning `false`.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Runs `task` once after `delay`.
    #[must_use]
    pub fn once<F>(delay: Duration, task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Self { handle: Some(handle) }
    }

    /// Runs `task` every `period`, first firing one full period from now.
    ///
    /// Missed ticks are delayed rather than bursted, so a slow callback never runs back-to-back.
    #[must_use]
    pub fn periodic<F>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task();
            }
        });
        Self { handle: Some(handle) }
    }

    /// Aborts the timer. Returns `true` only for the call that actually cancelled it.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Releases the handle without aborting. Used by a callback that retires its own timer.
    pub fn detach(mut self) {
        self.handle.take();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
