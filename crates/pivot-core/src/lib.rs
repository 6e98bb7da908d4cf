//! # Pivot Core
//!
//! Core library for Pivot, a control loop that continuously scores a set of blockchains and
//! decides when application writes should move from one chain to another.
//!
//! This crate provides:
//!
//! - **[`chain`]**: Chain descriptors and the two capabilities each chain plugs in
//!   ([`chain::MetricSource`], [`chain::LedgerAccess`]), the per-chain pipeline task, block
//!   statistics and an in-memory ledger.
//!
//! - **[`scoring`]**: Weighted scores from the latest metric values.
//!
//! - **[`validation`]**: Hysteresis-damped threshold validation per metric.
//!
//! - **[`advisor`]**: Cross-chain selection, disqualification, dedup and throttling of switchover
//!   suggestions.
//!
//! - **[`executor`]**: Data migration between chains with write buffering and replay.
//!
//! - **[`stream`]**: Reusable stream operators (hysteresis gate, eviction window, latest-join)
//!   and scheduled tasks.
//!
//! - **[`settings`]** and **[`config`]**: Ranking and validation rules, programmatic or loaded
//!   from TOML.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       SwitchoverManager                        │
//! │  ┌───────────────┐   ┌───────────────┐                         │
//! │  │ ChainPipeline │   │ ChainPipeline │  ...one per chain       │
//! │  │ scoring +     │   │ scoring +     │                         │
//! │  │ validation    │   │ validation    │                         │
//! │  └───────┬───────┘   └───────┬───────┘                         │
//! │          └─────────┬─────────┘                                 │
//! │                    ▼                                           │
//! │          ┌───────────────────┐  suggestions  ┌──────────────┐  │
//! │          │ SwitchoverAdvisor │ ────────────► │ subscribers  │  │
//! │          └───────────────────┘               └──────┬───────┘  │
//! │                                                     │ decide   │
//! │  write_data ──► ┌────────────────────┐ ◄────────────┘          │
//! │                 │ SwitchoverExecutor │  switch_over            │
//! │                 └────────────────────┘                         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The advisor only suggests; whether to switch is up to the caller.

pub mod advisor;
pub mod builder;
pub mod chain;
pub mod config;
pub mod errors;
pub mod executor;
pub mod manager;
pub mod scoring;
pub mod settings;
pub mod stream;
pub mod types;
pub mod validation;

pub use builder::{BuilderError, SwitchoverManagerBuilder};
pub use errors::{LedgerError, SwitchoverError};
pub use executor::{Phase, SwitchoverExecutor};
pub use manager::SwitchoverManager;
pub use types::{
    Block, CalculationResult, ChainId, Metric, MetricSample, SwitchoverSuggestion,
    ValidationResult, WeightedScore,
};
