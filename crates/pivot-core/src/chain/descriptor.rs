use super::{LedgerAccess, MetricSource};
use crate::{
    settings::{SettingsError, MAX_REPUTATION},
    types::ChainId,
};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU32, AtomicU8, Ordering},
        Arc,
    },
};
use tracing::info;

/// A registered chain: identity, capabilities and the two static metrics.
///
/// Equality and hashing use the id only. Everything except reputation and required
/// confirmations is fixed at construction; those two can be changed by an operator and take
/// effect at the chain's next recomputation.
pub struct ChainDescriptor {
    id: ChainId,
    source: Arc<dyn MetricSource>,
    ledger: Arc<dyn LedgerAccess>,
    required_confirmations: AtomicU32,
    reputation: AtomicU8,
}

impl ChainDescriptor {
    /// Creates a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidReputation`] if `reputation` is above 10.
    pub fn new(
        id: impl Into<ChainId>,
        source: Arc<dyn MetricSource>,
        ledger: Arc<dyn LedgerAccess>,
        required_confirmations: u32,
        reputation: u8,
    ) -> Result<Self, SettingsError> {
        validate_reputation(reputation)?;
        Ok(Self {
            id: id.into(),
            source,
            ledger,
            required_confirmations: AtomicU32::new(required_confirmations),
            reputation: AtomicU8::new(reputation),
        })
    }

    #[must_use]
    pub fn id(&self) -> &ChainId {
        &self.id
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn MetricSource> {
        &self.source
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LedgerAccess> {
        &self.ledger
    }

    #[must_use]
    pub fn required_confirmations(&self) -> u32 {
        self.required_confirmations.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn reputation(&self) -> u8 {
        self.reputation.load(Ordering::Acquire)
    }

    pub fn set_required_confirmations(&self, confirmations: u32) {
        let previous = self.required_confirmations.swap(confirmations, Ordering::AcqRel);
        info!(chain = %self.id, previous, confirmations, "required confirmations updated");
    }

    /// Updates the reputation.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidReputation`] if `reputation` is above 10; the stored value
    /// is left unchanged.
    pub fn set_reputation(&self, reputation: u8) -> Result<(), SettingsError> {
        validate_reputation(reputation)?;
        let previous = self.reputation.swap(reputation, Ordering::AcqRel);
        info!(chain = %self.id, previous, reputation, "reputation updated");
        Ok(())
    }
}

fn validate_reputation(reputation: u8) -> Result<(), SettingsError> {
    if reputation > MAX_REPUTATION {
        return Err(SettingsError::InvalidReputation(reputation));
    }
    Ok(())
}

impl PartialEq for ChainDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChainDescriptor {}

impl Hash for ChainDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainDescriptor")
            .field("id", &self.id)
            .field("required_confirmations", &self.required_confirmations())
            .field("reputation", &self.reputation())
            .finish_non_exhaustive()
    }
}
