//! Debounce-to-bad damping for boolean validity streams.

use super::{scheduler::ScheduledTask, TaskStream};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::debug;

/// Converts raw "is this metric within range?" samples into a damped validity stream.
///
/// The gate reports `false` only after raw `false` samples have persisted, uninterrupted, for the
/// whole grace period, and reports `true` again the instant a raw `true` arrives.
///
/// # State machine
///
/// | Raw sample | Last emitted | Timer pending | Action                             |
/// |------------|--------------|---------------|------------------------------------|
/// | `true`     | `false`      | -             | emit `true`                        |
/// | `true`     | `true`       | yes           | cancel timer                       |
/// | `false`    | `true`       | no            | arm timer (or emit `false` if 0)   |
/// | otherwise  |              |               | no-op                              |
///
/// The first value of the output is always `true`, before any upstream sample is seen.
///
/// # Thread Safety
///
/// The last-emitted flag, the pending timer and the emission itself live under one mutex, so a
/// late `true` and a timer that is mid-fire cannot interleave. Every armed timer carries a
/// generation number and a firing timer whose generation is no longer pending does nothing.
#[derive(Debug, Clone)]
pub struct HysteresisGate {
    grace: Duration,
    label: &'static str,
}

struct PendingTimer {
    generation: u64,
    task: ScheduledTask,
}

struct GateState {
    last_emitted: bool,
    pending: Option<PendingTimer>,
    generation: u64,
    output: Option<mpsc::UnboundedSender<bool>>,
}

impl GateState {
    fn emit(&mut self, value: bool) {
        self.last_emitted = value;
        if let Some(output) = &self.output {
            let _ = output.send(value);
        }
    }
}

struct GateCore {
    grace: Duration,
    label: &'static str,
    state: Mutex<GateState>,
}

impl HysteresisGate {
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self { grace, label: "metric" }
    }

    /// Sets the label attached to this gate's log lines.
    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Applies the gate to `upstream`, returning the damped stream.
    ///
    /// The output ends when `upstream` ends; any pending violation timer is cancelled first so no
    /// further value is produced after termination.
    pub fn attach<S>(self, upstream: S) -> TaskStream<bool>
    where
        S: Stream<Item = bool> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(true);

        let core = Arc::new(GateCore {
            grace: self.grace,
            label: self.label,
            state: Mutex::new(GateState {
                last_emitted: true,
                pending: None,
                generation: 0,
                output: Some(tx),
            }),
        });

        let driver = tokio::spawn(async move {
            futures::pin_mut!(upstream);
            while let Some(sample) = upstream.next().await {
                core.on_sample(sample);
            }
            core.close();
        });

        TaskStream::new(rx, driver)
    }
}

impl GateCore {
    fn on_sample(self: &Arc<Self>, raw: bool) {
        let mut state = self.state.lock();

        if raw {
            if !state.last_emitted {
                debug!(metric = self.label, "threshold recovered");
                state.emit(true);
            } else if let Some(mut pending) = state.pending.take() {
                debug!(metric = self.label, "violation ended before grace period elapsed");
                pending.task.cancel();
            }
            return;
        }

        if state.pending.is_some() || !state.last_emitted {
            return;
        }

        if self.grace.is_zero() {
            debug!(metric = self.label, "threshold violated");
            state.emit(false);
            return;
        }

        state.generation += 1;
        let generation = state.generation;
        let weak: Weak<GateCore> = Arc::downgrade(self);
        let task = ScheduledTask::once(self.grace, move || {
            if let Some(core) = weak.upgrade() {
                core.on_timer(generation);
            }
        });
        debug!(
            metric = self.label,
            grace_ms = u64::try_from(self.grace.as_millis()).unwrap_or(u64::MAX),
            "violation timer armed"
        );
        state.pending = Some(PendingTimer { generation, task });
    }

    fn on_timer(&self, generation: u64) {
        let mut state = self.state.lock();
        match state.pending.take() {
            Some(pending) if pending.generation == generation => {
                pending.task.detach();
                debug!(metric = self.label, "threshold violated for the whole grace period");
                state.emit(false);
            }
            other => state.pending = other,
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        if let Some(mut pending) = state.pending.take() {
            pending.task.cancel();
        }
        state.output = None;
    }
}
