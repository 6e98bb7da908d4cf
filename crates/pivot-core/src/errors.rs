use crate::types::ChainId;
use thiserror::Error;

/// Failures reported by a [`crate::chain::LedgerAccess`] implementation.
///
/// These surface unchanged to callers; the core never retries a ledger call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// Reading historical entries failed.
    #[error("Read from chain {chain} failed: {reason}")]
    ReadFailed { chain: ChainId, reason: String },

    /// Writing one or more entries failed.
    #[error("Write to chain {chain} failed: {reason}")]
    WriteFailed { chain: ChainId, reason: String },
}

impl LedgerError {
    /// Chain whose ledger reported the failure.
    #[must_use]
    pub fn chain(&self) -> &ChainId {
        match self {
            Self::ReadFailed { chain, .. } | Self::WriteFailed { chain, .. } => chain,
        }
    }
}

/// Errors returned by [`crate::SwitchoverManager::switch_over`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SwitchoverError {
    /// The requested chain is not registered.
    #[error("Unknown chain: {0}")]
    UnknownChain(ChainId),

    /// The requested chain is already the current write target; nothing was migrated.
    #[error("Chain {0} is already the current chain")]
    AlreadyActive(ChainId),

    /// Reading from the current chain or writing to the next one failed.
    ///
    /// The executor is back in its normal phase with the original chain current. Writes buffered
    /// during the attempt were replayed to the original chain; `undelivered` holds the ones that
    /// could not be, in submission order.
    #[error("Migration failed: {source}")]
    MigrationFailed {
        #[source]
        source: LedgerError,
        undelivered: Vec<String>,
    },

    /// The migration committed but flushing the write buffer to the new chain failed.
    ///
    /// The new chain stays current. `undelivered` holds the entry that failed and every entry
    /// after it.
    #[error("Buffered write replay failed: {source}")]
    ReplayFailed {
        #[source]
        source: LedgerError,
        undelivered: Vec<String>,
    },
}

impl SwitchoverError {
    /// Buffered writes that never reached any chain.
    #[must_use]
    pub fn undelivered(&self) -> &[String] {
        match self {
            Self::MigrationFailed { undelivered, .. } | Self::ReplayFailed { undelivered, .. } => {
                undelivered
            }
            Self::UnknownChain(_) | Self::AlreadyActive(_) => &[],
        }
    }
}
