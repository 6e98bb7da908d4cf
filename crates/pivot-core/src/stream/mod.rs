//! Stream primitives used to compose the per-chain pipelines.
//!
//! - [`EvictionWindow`]: rolling "last N hours" snapshots of a timestamped stream.
//! - [`HysteresisGate`]: debounce-to-bad damping of boolean validity samples.
//! - [`LatestJoin`]: combine-latest join over a fixed number of slots.
//! - [`ScheduledTask`]: one-shot and periodic background timers owned by a component.
//!
//! Operators that need a background driver return a [`TaskStream`], which owns the driver task and
//! aborts it when the consumer drops the stream.

pub mod eviction;
pub mod hysteresis;
pub mod join;
pub mod scheduler;

pub use eviction::{EvictionWindow, Timestamped};
pub use hysteresis::HysteresisGate;
pub use join::LatestJoin;
pub use scheduler::ScheduledTask;

use futures::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Output side of an operator backed by a spawned driver task.
///
/// Ends when the driver drops its sender (upstream terminated). Dropping the stream aborts the
/// driver.
pub struct TaskStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    driver: JoinHandle<()>,
}

impl<T> TaskStream<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>, driver: JoinHandle<()>) -> Self {
        Self { rx, driver }
    }
}

impl<T> Stream for TaskStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for TaskStream<T> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
