//! Integration tests for the switchover manager lifecycle.
//!
//! These tests verify the manager's behavioral contracts:
//! - Builder validation catches configuration errors before anything is spawned
//! - Per-chain result streams cache their latest value for late subscribers
//! - Operator changes to static chain values take effect on the next recomputation
//! - Acting on a suggestion moves subsequent writes to the suggested chain
//! - Shutdown is idempotent and ends every stream handed out earlier
//!
//! Tests use `tokio::time::timeout` to prevent hanging on failures.

use crate::mock_infrastructure::{
    baseline_samples, block_time_ranking, eventually, last_day, test_chain, TestChain,
};
use futures::StreamExt;
use pivot_core::{
    settings::{SettingsError, ValidationSettings},
    types::MetricSample,
    BuilderError, ChainId, SwitchoverManager,
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;

fn start(chains: &[&TestChain]) -> Arc<SwitchoverManager> {
    let manager = SwitchoverManager::builder()
        .add_chains(chains.iter().map(|c| Arc::clone(&c.descriptor)))
        .ranking_settings(block_time_ranking(Duration::ZERO).unwrap())
        .validation_settings(ValidationSettings::new())
        .initial_chain("Bitcoin")
        .build()
        .unwrap();
    Arc::new(manager)
}

#[tokio::test]
async fn test_builder_validation() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();

    let err = SwitchoverManager::builder()
        .ranking_settings(block_time_ranking(Duration::ZERO).unwrap())
        .validation_settings(ValidationSettings::new())
        .initial_chain("Bitcoin")
        .build()
        .unwrap_err();
    assert_eq!(err, BuilderError::NoChains);

    let err = SwitchoverManager::builder()
        .add_chain(Arc::clone(&bitcoin.descriptor))
        .validation_settings(ValidationSettings::new())
        .initial_chain("Bitcoin")
        .build()
        .unwrap_err();
    assert_eq!(err, BuilderError::MissingRankingSettings);

    let err = SwitchoverManager::builder()
        .add_chain(Arc::clone(&bitcoin.descriptor))
        .ranking_settings(block_time_ranking(Duration::ZERO).unwrap())
        .initial_chain("Bitcoin")
        .build()
        .unwrap_err();
    assert_eq!(err, BuilderError::MissingValidationSettings);

    let err = SwitchoverManager::builder()
        .add_chain(Arc::clone(&bitcoin.descriptor))
        .ranking_settings(block_time_ranking(Duration::ZERO).unwrap())
        .validation_settings(ValidationSettings::new())
        .initial_chain("Litecoin")
        .build()
        .unwrap_err();
    assert_eq!(err, BuilderError::UnknownInitialChain(ChainId::new("Litecoin")));
}

#[tokio::test]
async fn test_result_stream_caches_latest_value() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let manager = start(&[&bitcoin, &ethereum]);
    let id = ChainId::new("Ethereum");

    let mut results = manager.calculation_results(&id).unwrap();
    ethereum.feed.send_all(baseline_samples(13.5));

    let first = timeout(Duration::from_secs(5), results.next()).await.unwrap().unwrap();
    assert_eq!(first.chain_id(), &id);
    assert_eq!(first.overall_score(), 50);
    assert_eq!(first.chain.required_confirmations(), 12);

    // Bitcoin has not reported, so it has no result yet.
    assert!(manager.latest_result(&ChainId::new("Bitcoin")).is_none());

    let mut late = manager.calculation_results(&id).unwrap();
    let cached = timeout(Duration::from_secs(5), late.next()).await.unwrap().unwrap();
    assert_eq!(Some(cached), manager.latest_result(&id));
    manager.shutdown().await;
}

#[tokio::test]
async fn test_reputation_change_applies_on_next_recomputation() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let manager = start(&[&bitcoin]);
    let id = ChainId::new("Bitcoin");

    let score_is = |manager: Arc<SwitchoverManager>, expected: i64| async move {
        manager.latest_result(&ChainId::new("Bitcoin")).map(|r| r.overall_score()) ==
            Some(expected)
    };

    bitcoin.feed.send_all(baseline_samples(10.0));
    assert!(eventually(|| score_is(Arc::clone(&manager), 48)).await);

    bitcoin.descriptor.set_reputation(3).unwrap();
    assert_eq!(manager.latest_result(&id).map(|r| r.overall_score()), Some(48));
    assert!(matches!(
        bitcoin.descriptor.set_reputation(11),
        Err(SettingsError::InvalidReputation(11))
    ));

    bitcoin.feed.send(MetricSample::BlockTime(11.0));
    assert!(eventually(|| score_is(Arc::clone(&manager), 43)).await);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_applying_suggestion_moves_writes() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let manager = start(&[&bitcoin, &ethereum]);

    manager.write_data("before").await.unwrap();
    assert_eq!(bitcoin.ledger.entries(), vec!["before"]);

    bitcoin.feed.send_all(baseline_samples(600.0));
    ethereum.feed.send_all(baseline_samples(13.5));
    let suggestion = timeout(Duration::from_secs(5), manager.suggestions().next())
        .await
        .unwrap()
        .unwrap();

    let (from, to) = last_day();
    manager.apply(&suggestion, from, to).await.unwrap();
    manager.write_data("after").await.unwrap();

    assert_eq!(manager.current_chain().id().as_str(), "Ethereum");
    assert_eq!(ethereum.ledger.entries(), vec!["before", "after"]);
    assert_eq!(bitcoin.ledger.entries(), vec!["before"]);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_ends_streams() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let manager = start(&[&bitcoin, &ethereum]);

    let results = manager.calculation_results(&ChainId::new("Bitcoin")).unwrap();
    let suggestions = manager.suggestions();

    timeout(Duration::from_secs(5), manager.shutdown()).await.unwrap();
    timeout(Duration::from_secs(5), manager.shutdown()).await.unwrap();

    let results: Vec<_> = timeout(Duration::from_secs(5), results.collect()).await.unwrap();
    assert!(results.is_empty());
    let suggestions: Vec<_> = timeout(Duration::from_secs(5), suggestions.collect()).await.unwrap();
    assert!(suggestions.is_empty());

    // Writes still reach the current chain after the control loop stopped.
    manager.write_data("late").await.unwrap();
    assert_eq!(bitcoin.ledger.entries(), vec!["late"]);
}
