use crate::errors::LedgerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{fmt, sync::Arc};

type SplitFn = Arc<dyn Fn(&str, usize) -> Vec<String> + Send + Sync>;
type FitFn = Arc<dyn Fn(&[String], usize) -> Vec<String> + Send + Sync>;

/// Read/write access to one chain's ledger.
///
/// Payloads are opaque strings. A ledger that can only store bounded entries reports its limit
/// through [`max_payload_len`](Self::max_payload_len) and reshapes payloads with its
/// [`PayloadFormatter`] before storing them.
#[async_trait]
pub trait LedgerAccess: Send + Sync {
    /// Returns every entry written between `from` and `to`, inclusive, oldest first.
    async fn read(&self, from: DateTime<Utc>, to: DateTime<Utc>)
        -> Result<Vec<String>, LedgerError>;

    /// Stores a single payload.
    async fn write(&self, payload: &str) -> Result<(), LedgerError>;

    /// Stores a list of payloads, in order.
    async fn write_batch(&self, payloads: &[String]) -> Result<(), LedgerError>;

    fn formatter(&self) -> &PayloadFormatter;

    /// Largest entry the ledger accepts, in bytes. Zero means unbounded.
    fn max_payload_len(&self) -> usize {
        0
    }

    /// Splits one payload into entries that fit the ledger.
    fn prepare_payload(&self, payload: &str) -> Vec<String> {
        self.formatter().split(payload, self.max_payload_len())
    }

    /// Reshapes a list of payloads into entries that fit the ledger.
    fn prepare_batch(&self, payloads: &[String]) -> Vec<String> {
        self.formatter().fit(payloads, self.max_payload_len())
    }
}

/// The two pluggable policies a ledger uses for oversized payloads.
///
/// - `split(payload, max)`: one string into pieces no longer than `max`.
/// - `fit(list, max)`: a list into entries no longer than `max`, splitting or merging as the
///   policy sees fit.
#[derive(Clone)]
pub struct PayloadFormatter {
    split: SplitFn,
    fit: FitFn,
}

impl PayloadFormatter {
    pub fn new<S, F>(split: S, fit: F) -> Self
    where
        S: Fn(&str, usize) -> Vec<String> + Send + Sync + 'static,
        F: Fn(&[String], usize) -> Vec<String> + Send + Sync + 'static,
    {
        Self { split: Arc::new(split), fit: Arc::new(fit) }
    }

    /// Stores payloads as they are.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(|payload, _| vec![payload.to_owned()], |payloads, _| payloads.to_vec())
    }

    /// Cuts oversized payloads into consecutive chunks on UTF-8 character boundaries.
    /// List entries are chunked individually and never merged.
    #[must_use]
    pub fn chunked() -> Self {
        Self::new(chunk, |payloads, max| payloads.iter().flat_map(|p| chunk(p, max)).collect())
    }

    #[must_use]
    pub fn split(&self, payload: &str, max_len: usize) -> Vec<String> {
        (self.split)(payload, max_len)
    }

    #[must_use]
    pub fn fit(&self, payloads: &[String], max_len: usize) -> Vec<String> {
        (self.fit)(payloads, max_len)
    }
}

impl Default for PayloadFormatter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for PayloadFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadFormatter").finish_non_exhaustive()
    }
}

fn chunk(payload: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 || payload.len() <= max_len {
        return vec![payload.to_owned()];
    }

    let mut chunks = Vec::with_capacity(payload.len() / max_len + 1);
    let mut current = String::with_capacity(max_len);
    for ch in payload.chars() {
        if !current.is_empty() && current.len() + ch.len_utf8() > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
