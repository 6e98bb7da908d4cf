//! Mock Infrastructure for Testing Pivot
//!
//! This module provides reusable test doubles for the two capabilities a chain plugs in, so
//! the switchover control loop can be driven end to end without real chains.
//!
//! ## Components
//!
//! - `ScriptedSource` / `MetricFeed`: a metric source whose eight streams are fed by hand
//! - `GatedLedger`: an in-memory ledger whose reads can be held open to freeze a migration
//! - Test helpers for settings, chains and polling
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{baseline_samples, test_chain};
//!
//! let chain = test_chain("Bitcoin", 6, 8)?;
//! chain.feed.send_all(baseline_samples(600.0));
//!
//! // Register chain.descriptor with a SwitchoverManager and inspect chain.ledger afterwards
//! ```

pub mod ledgers;
pub mod sources;

pub use ledgers::GatedLedger;
pub use sources::{MetricFeed, ScriptedSource};
pub use test_helpers::*;
