//! Time-windowed eviction buffer.
//!
//! Turns an unbounded arrival stream of timestamped items into a periodically refreshed snapshot of
//! the items still inside a trailing window (e.g. "blocks of the last 24 hours"). Rate-based metric
//! adapters compose it with [`crate::chain::BlockStatistics`].

use super::{scheduler::ScheduledTask, TaskStream};
use crate::types::Block;
use chrono::{DateTime, TimeDelta, Utc};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::trace;

/// Default refresh cadence of the window.
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// An item that carries the wall-clock time it was produced at.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for Block {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Rolling window over a timestamped stream.
///
/// On every tick, items older than `now - window` are dropped and a copy of the survivors is
/// emitted. Ticking starts lazily with the first arrival, so an idle stream never wakes up.
#[derive(Debug, Clone)]
pub struct EvictionWindow {
    window: Duration,
    tick: Duration,
}

struct WindowCore<T> {
    window: TimeDelta,
    tick: Duration,
    items: Mutex<Vec<T>>,
    ticker: Mutex<Option<ScheduledTask>>,
    output: mpsc::UnboundedSender<Vec<T>>,
}

impl EvictionWindow {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, tick: DEFAULT_TICK }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Applies the window to `upstream`.
    ///
    /// The output ends when `upstream` ends; the periodic tick is cancelled at that point.
    pub fn attach<T, S>(self, upstream: S) -> TaskStream<Vec<T>>
    where
        T: Timestamped + Clone + Send + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let core = Arc::new(WindowCore {
            window: TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX),
            tick: self.tick,
            items: Mutex::new(Vec::new()),
            ticker: Mutex::new(None),
            output: tx,
        });

        let driver = tokio::spawn(async move {
            futures::pin_mut!(upstream);
            while let Some(item) = upstream.next().await {
                WindowCore::arm(&core);
                core.items.lock().push(item);
            }
            if let Some(mut ticker) = core.ticker.lock().take() {
                ticker.cancel();
            }
        });

        TaskStream::new(rx, driver)
    }
}

impl<T> WindowCore<T>
where
    T: Timestamped + Clone + Send + 'static,
{
    fn arm(core: &Arc<Self>) {
        let mut ticker = core.ticker.lock();
        if ticker.is_some() {
            return;
        }
        let weak = Arc::downgrade(core);
        *ticker = Some(ScheduledTask::periodic(core.tick, move || {
            if let Some(core) = weak.upgrade() {
                core.evict_and_emit();
            }
        }));
    }

    fn evict_and_emit(&self) {
        let snapshot = {
            let mut items = self.items.lock();
            let cutoff =
                Utc::now().checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC);
            items.retain(|item| item.timestamp() > cutoff);
            items.clone()
        };
        trace!(survivors = snapshot.len(), "eviction window refreshed");
        let _ = self.output.send(snapshot);
    }
}
