//! In-memory ledger used by the demo CLI and tests.

use super::{LedgerAccess, PayloadFormatter};
use crate::{errors::LedgerError, types::ChainId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry {
    written_at: DateTime<Utc>,
    payload: String,
}

/// A [`LedgerAccess`] that keeps timestamped entries in memory.
///
/// Supports an optional payload limit (applied through the configured [`PayloadFormatter`]) and
/// fault injection: the next read, or every write, can be made to fail.
#[derive(Debug)]
pub struct InMemoryLedger {
    chain: ChainId,
    entries: RwLock<Vec<Entry>>,
    formatter: PayloadFormatter,
    max_payload_len: usize,
    fail_next_read: AtomicBool,
    fail_writes: AtomicBool,
    fail_writes_after: AtomicUsize,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new(chain: impl Into<ChainId>) -> Self {
        Self {
            chain: chain.into(),
            entries: RwLock::new(Vec::new()),
            formatter: PayloadFormatter::identity(),
            max_payload_len: 0,
            fail_next_read: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_writes_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// Limits stored entries to `max_len` bytes, reshaping payloads with `formatter`.
    #[must_use]
    pub fn with_payload_limit(mut self, max_len: usize, formatter: PayloadFormatter) -> Self {
        self.max_payload_len = max_len;
        self.formatter = formatter;
        self
    }

    /// Seeds an entry with an explicit timestamp.
    pub fn insert_at(&self, written_at: DateTime<Utc>, payload: impl Into<String>) {
        let mut entries = self.entries.write();
        entries.push(Entry { written_at, payload: payload.into() });
        entries.sort_by_key(|e| e.written_at);
    }

    /// All stored payloads, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.payload.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Makes the next [`read`](LedgerAccess::read) fail.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// Makes every write fail until reset with `false`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lets `count` more entries be stored, then fails every write.
    pub fn fail_writes_after(&self, count: usize) {
        self.fail_writes_after.store(count, Ordering::SeqCst);
    }

    fn store(&self, payloads: Vec<String>) -> Result<(), LedgerError> {
        let mut entries = self.entries.write();
        for payload in payloads {
            self.check_write()?;
            trace!(chain = %self.chain, len = payload.len(), "entry stored");
            entries.push(Entry { written_at: Utc::now(), payload });
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), LedgerError> {
        let budget_exhausted = self
            .fail_writes_after
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_err();

        if self.fail_writes.load(Ordering::SeqCst) || budget_exhausted {
            return Err(LedgerError::WriteFailed {
                chain: self.chain.clone(),
                reason: "write rejected".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerAccess for InMemoryLedger {
    async fn read(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<String>, LedgerError> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::ReadFailed {
                chain: self.chain.clone(),
                reason: "read rejected".into(),
            });
        }
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.written_at >= from && e.written_at <= to)
            .map(|e| e.payload.clone())
            .collect())
    }

    async fn write(&self, payload: &str) -> Result<(), LedgerError> {
        self.store(self.prepare_payload(payload))
    }

    async fn write_batch(&self, payloads: &[String]) -> Result<(), LedgerError> {
        self.store(self.prepare_batch(payloads))
    }

    fn formatter(&self) -> &PayloadFormatter {
        &self.formatter
    }

    fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }
}
