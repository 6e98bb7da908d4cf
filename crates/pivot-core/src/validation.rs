//! Per-chain aggregation of damped metric validity into a [`ValidationResult`].

use crate::{
    settings::ValidationSettings,
    stream::{HysteresisGate, LatestJoin},
    types::{Metric, ValidationResult},
};
use std::sync::Arc;

/// Combines the latest gate output of the eight streaming metrics with the two static checks.
///
/// No result exists until every streaming gate has produced a value. Gates always emit `true`
/// first, so in practice a result is available as soon as the gates are attached.
#[derive(Debug)]
pub struct ValidationAggregator {
    settings: Arc<ValidationSettings>,
    gates: LatestJoin<bool>,
}

impl ValidationAggregator {
    #[must_use]
    pub fn new(settings: Arc<ValidationSettings>) -> Self {
        Self { settings, gates: LatestJoin::new(Metric::STREAMING.len()) }
    }

    #[must_use]
    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Hysteresis gate configured with `metric`'s grace period.
    #[must_use]
    pub fn gate_for(&self, metric: Metric) -> HysteresisGate {
        HysteresisGate::new(self.settings.grace(metric)).with_label(metric.as_str())
    }

    /// Records a damped gate output. Returns `true` if the value changed.
    pub fn record(&mut self, metric: Metric, passes: bool) -> bool {
        if metric.is_static() {
            return false;
        }
        self.gates.update(metric.index(), passes)
    }

    /// Current validation result, evaluating the static checks against the given values.
    #[must_use]
    pub fn result(&self, required_confirmations: u32, reputation: u8) -> Option<ValidationResult> {
        let gates = self.gates.snapshot()?;

        let mut passes = [true; 10];
        passes[..gates.len()].copy_from_slice(&gates);
        passes[Metric::RequiredConfirmations.index()] =
            self.settings.check_confirmations(required_confirmations);
        passes[Metric::Reputation.index()] = self.settings.check_reputation(reputation);
        Some(ValidationResult::new(passes))
    }
}
