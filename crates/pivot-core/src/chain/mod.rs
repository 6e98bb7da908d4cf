//! Chain registry entries and the capability interfaces each chain plugs in.
//!
//! A chain is described by a [`ChainDescriptor`], which bundles two capabilities:
//!
//! - [`MetricSource`]: eight continuous metric streams (costs, exchange rate, block statistics).
//! - [`LedgerAccess`]: reading and writing opaque string payloads.
//!
//! # Per-Chain Pipeline
//!
//! ```text
//! ┌──────────────┐  samples  ┌────────────────┐  weighted score   ┌──────────────────┐
//! │ MetricSource │ ────┬───► │ ScoringEngine  │ ────────────────► │                  │
//! └──────────────┘     │     └────────────────┘                   │ CalculationResult│ ──► advisor
//!                      │     ┌────────────────┐  ┌────────────┐   │                  │
//!                      └───► │ HysteresisGate │─►│ Validation │─► │                  │
//!                   (×8)     └────────────────┘  │ Aggregator │   └──────────────────┘
//!                                                └────────────┘
//! ```
//!
//! Each registered chain gets one [`ChainPipeline`] task. Its results are published both to the
//! advisor and to a per-chain latest-cached channel.
//!
//! Rate metrics derived from blocks (block time, throughput, mining distribution, hashrate) are
//! computed by [`BlockStatistics`] from an [`crate::stream::EvictionWindow`] snapshot, so metric
//! source adapters compose those two helpers instead of re-implementing them.

pub mod blocks;
pub mod descriptor;
pub mod ledger;
pub mod memory;
pub mod pipeline;
pub mod source;

pub use blocks::BlockStatistics;
pub use descriptor::ChainDescriptor;
pub use ledger::{LedgerAccess, PayloadFormatter};
pub use memory::InMemoryLedger;
pub use pipeline::{ChainPipeline, ResultSink};
pub use source::{MetricSource, MetricStreams};
