//! Integration Tests for Pivot
//!
//! This crate contains various test modules:
//!
//! - `switchover_tests`: Write buffering, rollback and cancellation of chain migrations
//! - `advisor_tests`: End-to-end suggestion flow from metric streams to published suggestions
//! - `manager_tests`: Manager lifecycle, per-chain result streams and shutdown
//! - `config_tests`: Loading the shipped configuration and environment overrides
//! - `mock_infrastructure`: Reusable metric sources, ledgers and settings for tests
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! None of the tests need network access. Metric values are pushed by hand through
//! [`mock_infrastructure::MetricFeed`] and ledgers live in memory.

#[cfg(test)]
mod switchover_tests;

#[cfg(test)]
mod advisor_tests;

#[cfg(test)]
mod manager_tests;

#[cfg(test)]
mod config_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
