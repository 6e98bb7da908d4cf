//! Ledger doubles for migration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pivot_core::{
    chain::{InMemoryLedger, LedgerAccess, PayloadFormatter},
    errors::LedgerError,
    types::ChainId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, Semaphore};

/// An [`InMemoryLedger`] whose reads and single writes can be held until the test releases them.
///
/// With reads held, a switchover blocks right after entering the migrating phase, which lets a
/// test write data, observe the buffer or cancel the migration at a known point. Held writes do
/// the same for the buffer flush. Batch writes are never held.
#[derive(Debug)]
pub struct GatedLedger {
    chain: ChainId,
    inner: InMemoryLedger,
    hold_reads: AtomicBool,
    read_started: Notify,
    released: Semaphore,
    hold_writes: AtomicBool,
    write_started: Notify,
    write_released: Semaphore,
}

impl GatedLedger {
    #[must_use]
    pub fn new(chain: impl Into<ChainId>) -> Self {
        let chain = chain.into();
        Self {
            inner: InMemoryLedger::new(chain.clone()),
            chain,
            hold_reads: AtomicBool::new(false),
            read_started: Notify::new(),
            released: Semaphore::new(0),
            hold_writes: AtomicBool::new(false),
            write_started: Notify::new(),
            write_released: Semaphore::new(0),
        }
    }

    /// The backing store, for seeding entries, fault injection and assertions.
    #[must_use]
    pub fn store(&self) -> &InMemoryLedger {
        &self.inner
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.inner.entries()
    }

    /// Makes every following read wait for [`release_read`](Self::release_read).
    pub fn hold_reads(&self) {
        self.hold_reads.store(true, Ordering::SeqCst);
    }

    /// Lets one held read proceed.
    pub fn release_read(&self) {
        self.released.add_permits(1);
    }

    /// Resolves once a read has started (and, if reads are held, is waiting).
    pub async fn read_started(&self) {
        self.read_started.notified().await;
    }

    /// Makes every following single write wait for [`release_writes`](Self::release_writes).
    pub fn hold_writes(&self) {
        self.hold_writes.store(true, Ordering::SeqCst);
    }

    /// Lets `n` held writes proceed.
    pub fn release_writes(&self, n: usize) {
        self.write_released.add_permits(n);
    }

    /// Resolves once a single write has started (and, if writes are held, is waiting).
    pub async fn write_started(&self) {
        self.write_started.notified().await;
    }
}

#[async_trait]
impl LedgerAccess for GatedLedger {
    async fn read(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<String>, LedgerError> {
        self.read_started.notify_one();
        if self.hold_reads.load(Ordering::SeqCst) {
            let permit = self.released.acquire().await.map_err(|_| LedgerError::ReadFailed {
                chain: self.chain.clone(),
                reason: "gate closed".into(),
            })?;
            permit.forget();
        }
        self.inner.read(from, to).await
    }

    async fn write(&self, payload: &str) -> Result<(), LedgerError> {
        if self.hold_writes.load(Ordering::SeqCst) {
            self.write_started.notify_one();
            let permit =
                self.write_released.acquire().await.map_err(|_| LedgerError::WriteFailed {
                    chain: self.chain.clone(),
                    reason: "gate closed".into(),
                })?;
            permit.forget();
        }
        self.inner.write(payload).await
    }

    async fn write_batch(&self, payloads: &[String]) -> Result<(), LedgerError> {
        self.inner.write_batch(payloads).await
    }

    fn formatter(&self) -> &PayloadFormatter {
        self.inner.formatter()
    }

    fn max_payload_len(&self) -> usize {
        self.inner.max_payload_len()
    }
}
