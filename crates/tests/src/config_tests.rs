//! Integration tests for loading the shipped configuration.

use pivot_core::{
    config::{AppConfig, DisqualifyMatch},
    types::{MetricSample, ValidationResult},
    Metric,
};
use rust_decimal::Decimal;
use std::time::Duration;

const SHIPPED_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/pivot.toml");

#[test]
fn test_shipped_config_builds_settings() {
    let config = AppConfig::from_file(SHIPPED_CONFIG).unwrap();
    config.validate().unwrap();

    assert_eq!(config.initial_chain_id(), Some("Expanse"));
    assert_eq!(config.chains.len(), 4);
    assert_eq!(config.min_suggestion_interval(), Duration::from_secs(60));

    let ranking = config.ranking_settings().unwrap();
    assert_eq!(ranking.weighted_sample(&MetricSample::WritingCost(Decimal::new(4, 1))), 20);
    assert_eq!(ranking.weighted_sample(&MetricSample::BlockTime(13.5)), 16);
    assert_eq!(ranking.weighted_sample(&MetricSample::BlockTime(600.0)), 0);
    assert_eq!(ranking.weighted_sample(&MetricSample::NetworkHashrate(1e12)), 0);
}

#[test]
fn test_shipped_config_disqualifies_only_when_all_watched_metrics_fail() {
    let config = AppConfig::from_file(SHIPPED_CONFIG).unwrap();
    assert_eq!(config.validation.disqualify_match, DisqualifyMatch::All);
    let validation = config.validation_settings();

    let mut passes = [true; 10];
    passes[Metric::WritingCost.index()] = false;
    assert!(!validation.is_disqualified(&ValidationResult::new(passes)));

    passes[Metric::BlockTime.index()] = false;
    assert!(validation.is_disqualified(&ValidationResult::new(passes)));

    assert_eq!(validation.grace(Metric::BlockTime), Duration::from_secs(120));
    assert!(!validation.check(&MetricSample::BlockTime(45.0)));
    assert!(validation.check(&MetricSample::BlockTime(13.5)));
}

#[test]
fn test_environment_overrides_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pivot.toml");
    std::fs::write(
        &path,
        r#"
[[chains]]
id = "Bitcoin"
reputation = 8

[eviction]
tick_seconds = 2
"#,
    )
    .unwrap();

    std::env::set_var("PIVOT__EVICTION__TICK_SECONDS", "9");
    let loaded = AppConfig::from_file(&path);
    std::env::remove_var("PIVOT__EVICTION__TICK_SECONDS");

    let loaded = loaded.unwrap();
    loaded.validate().unwrap();
    assert_eq!(loaded.eviction.tick_seconds, 9);
    assert_eq!(loaded.eviction.window_seconds, 86_400);
    assert_eq!(loaded.min_suggestion_interval(), Duration::from_secs(60));
    assert_eq!(loaded.initial_chain_id(), Some("Bitcoin"));
    assert_eq!(loaded.chains[0].required_confirmations, 6);

    // Metrics without a ranking table contribute nothing.
    let ranking = loaded.ranking_settings().unwrap();
    assert_eq!(ranking.weighted_sample(&MetricSample::BlockTime(1.0)), 0);
}
