//! Switchover state machine and steady-state write router.
//!
//! # Phases
//!
//! ```text
//!            switch_over() begins
//!   ┌────────┐ ──────────────────► ┌───────────┐
//!   │ Normal │                     │ Migrating │  write_data() buffers
//!   └────────┘ ◄────────────────── └───────────┘
//!     write_data()   commit or rollback
//!     forwards       (buffer drained FIFO)
//! ```
//!
//! A single async mutex guards the phase and the write buffer. In the normal phase `write_data`
//! forwards to the current chain while still holding that mutex, so a write can never race the
//! phase flip at the start of a migration. Slow ledger writes therefore serialize all writers;
//! this is the one place the lock is held across I/O.
//!
//! The migration itself (read from the current chain, batch write to the next one) runs without
//! the mutex. Its outcome is applied by a [`MigrationGuard`], which always returns the executor to
//! the normal phase, including when the migrating future is dropped halfway. The phase stays
//! migrating until the buffer is empty, so writes arriving during the flush queue behind it.

use crate::{
    advisor::CurrentChain,
    chain::{ChainDescriptor, LedgerAccess},
    errors::{LedgerError, SwitchoverError},
};
use chrono::{DateTime, Utc};
use std::{collections::VecDeque, fmt, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// Executor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Normal,
    Migrating,
}

#[derive(Debug)]
struct WriteState {
    phase: Phase,
    buffer: VecDeque<String>,
}

struct ExecutorInner {
    current: CurrentChain,
    state: Mutex<WriteState>,
    migration: Arc<Mutex<()>>,
}

/// Routes writes to the current chain and performs migrations between chains.
#[derive(Clone)]
pub struct SwitchoverExecutor {
    inner: Arc<ExecutorInner>,
}

impl fmt::Debug for SwitchoverExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchoverExecutor")
            .field("current", self.inner.current.load().id())
            .finish_non_exhaustive()
    }
}

impl SwitchoverExecutor {
    #[must_use]
    pub fn new(current: CurrentChain) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                current,
                state: Mutex::new(WriteState { phase: Phase::Normal, buffer: VecDeque::new() }),
                migration: Arc::new(Mutex::new(())),
            }),
        }
    }

    #[must_use]
    pub fn current_chain(&self) -> Arc<ChainDescriptor> {
        self.inner.current.load_full()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase
    }

    /// Number of writes waiting for a migration to finish.
    pub async fn buffered_len(&self) -> usize {
        self.inner.state.lock().await.buffer.len()
    }

    /// Writes `payload` to the current chain, or buffers it while a migration is in progress.
    ///
    /// # Errors
    ///
    /// Returns the current chain's [`LedgerError`] unchanged. Buffered writes never fail here;
    /// their fate is reported by [`switch_over`](Self::switch_over).
    pub async fn write_data(&self, payload: impl Into<String>) -> Result<(), LedgerError> {
        let payload = payload.into();
        let mut state = self.inner.state.lock().await;
        match state.phase {
            Phase::Migrating => {
                state.buffer.push_back(payload);
                debug!(buffered = state.buffer.len(), "write buffered during migration");
                Ok(())
            }
            Phase::Normal => {
                let chain = self.inner.current.load_full();
                chain.ledger().write(&payload).await
            }
        }
    }

    /// Migrates entries written between `from` and `to` from the current chain to `next`, then
    /// makes `next` the write target.
    ///
    /// Concurrent calls are serialized.
    ///
    /// # Errors
    ///
    /// - [`SwitchoverError::AlreadyActive`] if `next` is already current.
    /// - [`SwitchoverError::MigrationFailed`] if reading or writing the batch fails; the original
    ///   chain stays current and buffered writes are replayed to it.
    /// - [`SwitchoverError::ReplayFailed`] if the migration committed but flushing buffered
    ///   writes to `next` failed.
    pub async fn switch_over(
        &self,
        next: Arc<ChainDescriptor>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), SwitchoverError> {
        let serial = Arc::clone(&self.inner.migration).lock_owned().await;

        let original = self.inner.current.load_full();
        if original.id() == next.id() {
            return Err(SwitchoverError::AlreadyActive(next.id().clone()));
        }

        info!(
            from_chain = %original.id(),
            to_chain = %next.id(),
            %from,
            %to,
            "starting switchover"
        );
        let guard =
            MigrationGuard::begin(Arc::clone(&self.inner), Arc::clone(&original), serial).await;

        let entries = match original.ledger().read(from, to).await {
            Ok(entries) => entries,
            Err(e) => return Err(guard.rollback(e).await),
        };
        debug!(entries = entries.len(), "entries read from current chain");

        if let Err(e) = next.ledger().write_batch(&entries).await {
            return Err(guard.rollback(e).await);
        }

        guard.commit(next).await
    }
}

/// Scope of one migration: entered in the migrating phase, always left in the normal phase.
///
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) apply the outcome. If the guard is
/// dropped without either finishing (the migrating future was cancelled or panicked, possibly in
/// the middle of the buffer flush), a background task drains what is left of the buffer to
/// whichever chain is current at that point and then restores the normal phase. That task keeps
/// the migration lock, so the next switchover starts only after it is done. An entry whose write
/// was cancelled in flight is written again by that task.
pub struct MigrationGuard {
    inner: Arc<ExecutorInner>,
    original: Arc<ChainDescriptor>,
    serial: Option<OwnedMutexGuard<()>>,
    finished: bool,
}

impl MigrationGuard {
    async fn begin(
        inner: Arc<ExecutorInner>,
        original: Arc<ChainDescriptor>,
        serial: OwnedMutexGuard<()>,
    ) -> Self {
        inner.state.lock().await.phase = Phase::Migrating;
        Self { inner, original, serial: Some(serial), finished: false }
    }

    async fn commit(mut self, next: Arc<ChainDescriptor>) -> Result<(), SwitchoverError> {
        let inner = Arc::clone(&self.inner);
        let mut state = inner.state.lock().await;
        inner.current.store(Arc::clone(&next));
        info!(chain = %next.id(), buffered = state.buffer.len(), "switchover committed");

        let flushed = drain(&mut state.buffer, next.ledger().as_ref()).await;
        state.phase = Phase::Normal;
        self.finished = true;

        flushed.map_err(|(source, undelivered)| {
            error!(
                chain = %next.id(),
                undelivered = undelivered.len(),
                error = %source,
                "buffer flush failed"
            );
            SwitchoverError::ReplayFailed { source, undelivered }
        })
    }

    async fn rollback(mut self, source: LedgerError) -> SwitchoverError {
        let inner = Arc::clone(&self.inner);
        let mut state = inner.state.lock().await;
        warn!(
            chain = %self.original.id(),
            error = %source,
            buffered = state.buffer.len(),
            "switchover failed, rolling back"
        );

        let replayed = drain(&mut state.buffer, self.original.ledger().as_ref()).await;
        state.phase = Phase::Normal;
        self.finished = true;

        let undelivered = match replayed {
            Ok(()) => Vec::new(),
            Err((replay_error, undelivered)) => {
                error!(
                    chain = %self.original.id(),
                    error = %replay_error,
                    undelivered = undelivered.len(),
                    "buffer replay to original chain failed"
                );
                undelivered
            }
        };
        SwitchoverError::MigrationFailed { source, undelivered }
    }
}

impl Drop for MigrationGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let serial = self.serial.take();
        warn!(chain = %self.original.id(), "switchover abandoned, restoring normal phase");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            if let Ok(mut state) = inner.state.try_lock() {
                state.phase = Phase::Normal;
            }
            return;
        };
        runtime.spawn(async move {
            let _serial = serial;
            let mut state = inner.state.lock().await;
            let target = inner.current.load_full();
            let replay = drain(&mut state.buffer, target.ledger().as_ref()).await;
            state.phase = Phase::Normal;
            if let Err((e, undelivered)) = replay {
                error!(
                    chain = %target.id(),
                    error = %e,
                    undelivered = undelivered.len(),
                    "buffered writes lost after abandoned switchover"
                );
            }
        });
    }
}

/// Writes buffered entries in FIFO order, one write per entry. An entry leaves the buffer only
/// once its write succeeded. On failure returns the error and every entry that was not delivered
/// (the failing one first), leaving the buffer empty.
async fn drain(
    buffer: &mut VecDeque<String>,
    ledger: &dyn LedgerAccess,
) -> Result<(), (LedgerError, Vec<String>)> {
    while let Some(entry) = buffer.front() {
        let written = ledger.write(entry).await;
        if let Err(e) = written {
            return Err((e, buffer.drain(..).collect()));
        }
        buffer.pop_front();
    }
    Ok(())
}
