//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file passed explicitly or named by the `PIVOT_CONFIG` env var
//! 3. **Environment variables**: `PIVOT__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`LoggingConfig`]: Log level and format
//! - [`AdvisorConfig`]: Minimum span between two suggestions
//! - [`EvictionConfig`]: Observation window for block-derived metrics
//! - [`RankingConfig`]: Band tables turning metric values into scores
//! - [`ValidationConfig`]: Accepted ranges, grace periods and the disqualification rule
//! - [`ChainConfig`]: Registered chains and their simulated metric sources
//!
//! # Validation
//!
//! [`AppConfig::validate`] rejects configurations that would fail at build time (no chains,
//! duplicate ids, unknown initial chain) as well as values that make no sense (zero windows,
//! unordered bands, reputation above 10).
//!
//! # Example
//!
//! ```toml
//! initial_chain = "Expanse"
//!
//! [advisor]
//! min_suggestion_interval_seconds = 60
//!
//! [ranking.block_time]
//! weight = 4
//! bands = [{ below = 15.0, score = 4 }, { below = 30.0, score = 3 }]
//!
//! [validation.block_time]
//! max = 30.0
//! grace_seconds = 120
//!
//! [[chains]]
//! id = "Expanse"
//! required_confirmations = 12
//! reputation = 4
//! ```

pub mod rules;

pub use rules::{
    ConfigValue, DisqualifyMatch, MetricRankingConfig, MetricValidationConfig, RankingConfig,
    ScoreBand, ValidationConfig,
};

use crate::{
    settings::{RankingSettings, SettingsError, ValidationSettings, MAX_REPUTATION},
    stream::EvictionWindow,
    types::Metric,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};
use thiserror::Error;

/// Default config file path when neither `--config` nor `PIVOT_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/pivot.toml";

/// Semantic configuration errors found by [`AppConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigValidationError {
    #[error("No chains configured")]
    NoChains,

    #[error("Chain {0} is configured more than once")]
    DuplicateChain(String),

    #[error("Chain {chain} has reputation {reputation}, expected 0..={max}", max = MAX_REPUTATION)]
    InvalidReputation { chain: String, reputation: u8 },

    #[error("Initial chain {0} is not configured")]
    UnknownInitialChain(String),

    #[error("Eviction window must be greater than 0")]
    ZeroEvictionWindow,

    #[error("Eviction tick must be greater than 0")]
    ZeroEvictionTick,

    #[error("Simulation update interval of chain {0} must be greater than 0")]
    ZeroUpdateInterval(String),

    #[error("Ranking bands for {0} must have strictly ascending limits")]
    UnorderedBands(Metric),

    #[error("Validation range for {0} has min greater than max")]
    InvalidRange(Metric),

    #[error("Logging format must be 'json' or 'pretty', got '{0}'")]
    InvalidLoggingFormat(String),
}

/// Application logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Switchover advisor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Minimum seconds between two emitted suggestions. `0` disables throttling. Defaults to
    /// `60`.
    #[serde(default = "default_min_suggestion_interval_seconds")]
    pub min_suggestion_interval_seconds: u64,
}

fn default_min_suggestion_interval_seconds() -> u64 {
    60
}

/// Observation window for block-derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Items older than this are dropped from the window. Defaults to one day.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Eviction period while the upstream is active. Defaults to `5`.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_window_seconds() -> u64 {
    86_400
}

fn default_tick_seconds() -> u64 {
    5
}

/// Parameters of the random-walk metric source used by the demo binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting writing cost in exchange-rate units. Defaults to `1.0`.
    #[serde(default = "default_cost")]
    pub writing_cost: f64,

    /// Starting retrieval cost. Defaults to `0.0`.
    #[serde(default)]
    pub retrieval_cost: f64,

    /// Starting storage fee. Defaults to `0.0`.
    #[serde(default)]
    pub storage_fee: f64,

    /// Starting exchange rate. Defaults to `1.0`.
    #[serde(default = "default_cost")]
    pub exchange_rate: f64,

    /// Mean seconds between two simulated blocks. Defaults to `15`.
    #[serde(default = "default_block_interval_seconds")]
    pub block_interval_seconds: f64,

    /// Mean transactions per block. Defaults to `100`.
    #[serde(default = "default_transactions_per_block")]
    pub transactions_per_block: u32,

    /// Number of distinct miners. Defaults to `5`.
    #[serde(default = "default_miners")]
    pub miners: usize,

    /// Relative random-walk step per update (e.g. `0.05` = ±5%). Defaults to `0.05`.
    #[serde(default = "default_volatility")]
    pub volatility: f64,

    /// Milliseconds between two simulated updates. Defaults to `1000`.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Longest payload the simulated ledger accepts. `0` means unbounded. Defaults to `0`.
    #[serde(default)]
    pub max_payload_len: usize,
}

fn default_cost() -> f64 {
    1.0
}

fn default_block_interval_seconds() -> f64 {
    15.0
}

fn default_transactions_per_block() -> u32 {
    100
}

fn default_miners() -> usize {
    5
}

fn default_volatility() -> f64 {
    0.05
}

fn default_update_interval_ms() -> u64 {
    1000
}

/// A registered chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: String,

    /// Confirmations a write needs before it counts as final. Defaults to `6`.
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u32,

    /// Operator-assigned trust, `0..=10`. Defaults to `5`.
    #[serde(default = "default_reputation")]
    pub reputation: u8,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_required_confirmations() -> u32 {
    6
}

fn default_reputation() -> u8 {
    5
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub advisor: AdvisorConfig,

    #[serde(default)]
    pub eviction: EvictionConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    /// Registered chains, in evaluation order.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,

    /// Chain writes go to at startup. Defaults to the first configured chain.
    #[serde(default)]
    pub initial_chain: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self { min_suggestion_interval_seconds: default_min_suggestion_interval_seconds() }
    }
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self { window_seconds: default_window_seconds(), tick_seconds: default_tick_seconds() }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            writing_cost: default_cost(),
            retrieval_cost: 0.0,
            storage_fee: 0.0,
            exchange_rate: default_cost(),
            block_interval_seconds: default_block_interval_seconds(),
            transactions_per_block: default_transactions_per_block(),
            miners: default_miners(),
            volatility: default_volatility(),
            update_interval_ms: default_update_interval_ms(),
            max_payload_len: 0,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `PIVOT__` prefix can override any configuration value.
    /// Use `__` as a separator for nested fields (e.g.,
    /// `PIVOT__ADVISOR__MIN_SUGGESTION_INTERVAL_SECONDS=10`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .set_default(
                "advisor.min_suggestion_interval_seconds",
                default_min_suggestion_interval_seconds(),
            )?
            .set_default("eviction.window_seconds", default_window_seconds())?
            .set_default("eviction.tick_seconds", default_tick_seconds())?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("PIVOT").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] with fallback to defaults.
    ///
    /// The config file path can be overridden using the `PIVOT_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PIVOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigValidationError`] found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.chains.is_empty() {
            return Err(ConfigValidationError::NoChains);
        }

        let mut seen = HashSet::with_capacity(self.chains.len());
        for chain in &self.chains {
            if !seen.insert(chain.id.as_str()) {
                return Err(ConfigValidationError::DuplicateChain(chain.id.clone()));
            }
            if chain.reputation > MAX_REPUTATION {
                return Err(ConfigValidationError::InvalidReputation {
                    chain: chain.id.clone(),
                    reputation: chain.reputation,
                });
            }
            if chain.simulation.update_interval_ms == 0 {
                return Err(ConfigValidationError::ZeroUpdateInterval(chain.id.clone()));
            }
        }

        if let Some(initial) = &self.initial_chain {
            if !seen.contains(initial.as_str()) {
                return Err(ConfigValidationError::UnknownInitialChain(initial.clone()));
            }
        }

        if self.eviction.window_seconds == 0 {
            return Err(ConfigValidationError::ZeroEvictionWindow);
        }
        if self.eviction.tick_seconds == 0 {
            return Err(ConfigValidationError::ZeroEvictionTick);
        }

        for metric in Metric::ALL {
            if self.ranking.get(metric).is_some_and(|t| !t.is_ordered()) {
                return Err(ConfigValidationError::UnorderedBands(metric));
            }
            if self.validation.get(metric).is_some_and(|r| !r.is_consistent()) {
                return Err(ConfigValidationError::InvalidRange(metric));
            }
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(ConfigValidationError::InvalidLoggingFormat(self.logging.format.clone()));
        }

        Ok(())
    }

    /// Id of the chain writes go to at startup.
    #[must_use]
    pub fn initial_chain_id(&self) -> Option<&str> {
        self.initial_chain.as_deref().or_else(|| self.chains.first().map(|c| c.id.as_str()))
    }

    #[must_use]
    pub fn min_suggestion_interval(&self) -> Duration {
        Duration::from_secs(self.advisor.min_suggestion_interval_seconds)
    }

    #[must_use]
    pub fn eviction_window(&self) -> EvictionWindow {
        EvictionWindow::new(Duration::from_secs(self.eviction.window_seconds))
            .with_tick(Duration::from_secs(self.eviction.tick_seconds))
    }

    /// Builds [`RankingSettings`] from the `ranking` section and the advisor interval.
    ///
    /// # Errors
    ///
    /// Propagates [`SettingsError`] from the settings builder.
    pub fn ranking_settings(&self) -> Result<RankingSettings, SettingsError> {
        self.ranking.to_settings(self.min_suggestion_interval())
    }

    #[must_use]
    pub fn validation_settings(&self) -> ValidationSettings {
        self.validation.to_settings()
    }
}
