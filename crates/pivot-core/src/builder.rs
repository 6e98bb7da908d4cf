//! Builder pattern for constructing a [`SwitchoverManager`].

use crate::{
    chain::ChainDescriptor,
    manager::SwitchoverManager,
    settings::{RankingSettings, ValidationSettings},
    types::ChainId,
};
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;

/// Errors that can occur during manager construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// No chain was registered.
    #[error("At least one chain must be registered")]
    NoChains,

    /// `RankingSettings` is required but was not provided
    #[error("`RankingSettings` is required but was not provided")]
    MissingRankingSettings,

    /// `ValidationSettings` is required but was not provided
    #[error("`ValidationSettings` is required but was not provided")]
    MissingValidationSettings,

    /// No initial chain was selected.
    #[error("An initial chain must be selected")]
    MissingInitialChain,

    /// The selected initial chain is not registered.
    #[error("Initial chain {0} is not registered")]
    UnknownInitialChain(ChainId),

    /// Two registered chains share an id.
    #[error("Chain {0} is registered more than once")]
    DuplicateChain(ChainId),
}

/// Builder for constructing a [`SwitchoverManager`].
///
/// Chains are evaluated in registration order, which also decides ties between equally scored
/// chains.
///
/// # Examples
///
/// ```no_run
/// # use pivot_core::{SwitchoverManagerBuilder, settings::{RankingSettings, ValidationSettings}};
/// # use pivot_core::chain::ChainDescriptor;
/// # async fn example(
/// #     bitcoin: ChainDescriptor,
/// #     ethereum: ChainDescriptor,
/// #     ranking: RankingSettings,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = SwitchoverManagerBuilder::new()
///     .ranking_settings(ranking)
///     .validation_settings(ValidationSettings::new())
///     .add_chain(bitcoin)
///     .add_chain(ethereum)
///     .initial_chain("Bitcoin")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SwitchoverManagerBuilder {
    chains: Vec<Arc<ChainDescriptor>>,
    ranking: Option<Arc<RankingSettings>>,
    validation: Option<Arc<ValidationSettings>>,
    initial_chain: Option<ChainId>,
}

impl SwitchoverManagerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_chain(mut self, chain: impl Into<Arc<ChainDescriptor>>) -> Self {
        self.chains.push(chain.into());
        self
    }

    #[must_use]
    pub fn add_chains<I>(mut self, chains: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<ChainDescriptor>>,
    {
        self.chains.extend(chains.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn ranking_settings(mut self, settings: impl Into<Arc<RankingSettings>>) -> Self {
        self.ranking = Some(settings.into());
        self
    }

    #[must_use]
    pub fn validation_settings(mut self, settings: impl Into<Arc<ValidationSettings>>) -> Self {
        self.validation = Some(settings.into());
        self
    }

    /// Selects the chain writes go to until the first switchover.
    #[must_use]
    pub fn initial_chain(mut self, id: impl Into<ChainId>) -> Self {
        self.initial_chain = Some(id.into());
        self
    }

    /// Builds the manager and starts its background tasks.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`BuilderError`] if a required part is missing or inconsistent.
    pub fn build(self) -> Result<SwitchoverManager, BuilderError> {
        if self.chains.is_empty() {
            return Err(BuilderError::NoChains);
        }

        let mut seen = HashSet::with_capacity(self.chains.len());
        for chain in &self.chains {
            if !seen.insert(chain.id()) {
                return Err(BuilderError::DuplicateChain(chain.id().clone()));
            }
        }

        let ranking = self.ranking.ok_or(BuilderError::MissingRankingSettings)?;
        let validation = self.validation.ok_or(BuilderError::MissingValidationSettings)?;
        let initial_id = self.initial_chain.ok_or(BuilderError::MissingInitialChain)?;
        let initial = self
            .chains
            .iter()
            .find(|c| *c.id() == initial_id)
            .cloned()
            .ok_or(BuilderError::UnknownInitialChain(initial_id))?;

        Ok(SwitchoverManager::start(self.chains, initial, ranking, validation))
    }
}
