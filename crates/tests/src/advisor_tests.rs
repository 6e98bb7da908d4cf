//! Integration tests for the suggestion flow.
//!
//! Metric samples are pushed through scripted sources and the resulting suggestions are read
//! back from the manager, exercising the per-chain pipelines, the hysteresis gates and the
//! advisor together.
//!
//! Tests that depend on grace periods or throttling run with a paused clock so timers fire
//! deterministically.

use crate::mock_infrastructure::{
    baseline_samples, block_time_ranking, eventually, test_chain, TestChain,
};
use futures::StreamExt;
use pivot_core::{
    settings::{ValidationRule, ValidationSettings},
    types::MetricSample,
    ChainId, Metric, SwitchoverManager, SwitchoverSuggestion,
};
use std::{sync::Arc, time::Duration};
use tokio::time::{timeout, Instant};

fn start(
    chains: &[&TestChain],
    min_interval: Duration,
    validation: ValidationSettings,
) -> Arc<SwitchoverManager> {
    let manager = SwitchoverManager::builder()
        .add_chains(chains.iter().map(|c| Arc::clone(&c.descriptor)))
        .ranking_settings(block_time_ranking(min_interval).unwrap())
        .validation_settings(validation)
        .initial_chain("Bitcoin")
        .build()
        .unwrap();
    Arc::new(manager)
}

async fn next_suggestion(manager: &SwitchoverManager) -> SwitchoverSuggestion {
    timeout(Duration::from_secs(5), manager.suggestions().next())
        .await
        .expect("no suggestion within 5s")
        .expect("suggestion stream ended")
}

#[tokio::test]
async fn test_suggests_highest_scoring_chain() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let classic = test_chain("Ethereum Classic", 12, 7).unwrap();
    let manager =
        start(&[&bitcoin, &ethereum, &classic], Duration::ZERO, ValidationSettings::new());

    bitcoin.feed.send_all(baseline_samples(600.0));
    ethereum.feed.send_all(baseline_samples(13.5));
    classic.feed.send_all(baseline_samples(13.5));

    let suggestion = next_suggestion(&manager).await;
    assert_eq!(suggestion.current_chain().as_str(), "Bitcoin");
    assert_eq!(suggestion.next_chain().as_str(), "Ethereum");
    assert_eq!(suggestion.current.overall_score(), 8);
    assert_eq!(suggestion.next.overall_score(), 50);
    assert_eq!(suggestion.score_gain(), 42);

    // A late subscriber immediately sees the cached suggestion.
    let late = next_suggestion(&manager).await;
    assert_eq!(late, suggestion);
    assert_eq!(manager.latest_suggestion(), Some(suggestion));
    manager.shutdown().await;
}

#[tokio::test]
async fn test_no_suggestion_while_current_chain_is_best() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let manager = start(&[&bitcoin, &ethereum], Duration::ZERO, ValidationSettings::new());

    bitcoin.feed.send_all(baseline_samples(10.0));
    ethereum.feed.send_all(baseline_samples(40.0));

    let reported = eventually(|| {
        let manager = Arc::clone(&manager);
        async move {
            manager.latest_result(&ChainId::new("Bitcoin")).is_some() &&
                manager.latest_result(&ChainId::new("Ethereum")).is_some()
        }
    })
    .await;
    assert!(reported);
    assert!(manager.latest_suggestion().is_none());

    // Once the current chain degrades the other one is proposed.
    bitcoin.feed.send(MetricSample::BlockTime(600.0));
    let suggestion = next_suggestion(&manager).await;
    assert_eq!(suggestion.next_chain().as_str(), "Ethereum");
    manager.shutdown().await;
}

#[tokio::test]
async fn test_disqualified_chain_is_never_suggested() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let classic = test_chain("Ethereum Classic", 12, 7).unwrap();
    let validation = ValidationSettings::new()
        .reputation(ValidationRule::new(|r: &u8| *r >= 8, Duration::ZERO))
        .disqualify_when(|passes| !passes[Metric::Reputation.index()]);
    let manager = start(&[&bitcoin, &ethereum, &classic], Duration::ZERO, validation);

    bitcoin.feed.send_all(baseline_samples(600.0));
    ethereum.feed.send_all(baseline_samples(40.0));
    classic.feed.send_all(baseline_samples(10.0));

    let suggestion = next_suggestion(&manager).await;
    assert_eq!(suggestion.next_chain().as_str(), "Ethereum");
    assert_eq!(suggestion.next.overall_score(), 30);

    let classic_result = manager.latest_result(&ChainId::new("Ethereum Classic")).unwrap();
    assert_eq!(classic_result.overall_score(), 47);
    assert!(!classic_result.validation.passes(Metric::Reputation));
    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_suggestions_are_throttled() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let classic = test_chain("Ethereum Classic", 12, 7).unwrap();
    let manager = start(
        &[&bitcoin, &ethereum, &classic],
        Duration::from_secs(60),
        ValidationSettings::new(),
    );

    bitcoin.feed.send_all(baseline_samples(600.0));
    ethereum.feed.send_all(baseline_samples(40.0));
    classic.feed.send_all(baseline_samples(100.0));

    let mut suggestions = manager.suggestions();
    let first = suggestions.next().await.unwrap();
    assert_eq!(first.next_chain().as_str(), "Ethereum");
    let emitted_at = Instant::now();

    classic.feed.send(MetricSample::BlockTime(5.0));
    let second = suggestions.next().await.unwrap();
    assert_eq!(second.next_chain().as_str(), "Ethereum Classic");
    assert_eq!(second.next.overall_score(), 47);
    assert!(emitted_at.elapsed() >= Duration::from_secs(59));
    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_violation_within_grace_period_is_ignored() {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let validation = ValidationSettings::new()
        .block_time(ValidationRule::new(|t: &f64| *t < 30.0, Duration::from_secs(120)));
    let manager = start(&[&bitcoin], Duration::ZERO, validation);
    let id = ChainId::new("Bitcoin");

    let block_time_score = |manager: Arc<SwitchoverManager>, expected: i64| async move {
        manager.latest_result(&ChainId::new("Bitcoin")).map(|r| r.score.get(Metric::BlockTime)) ==
            Some(expected)
    };

    bitcoin.feed.send_all(baseline_samples(10.0));
    assert!(eventually(|| block_time_score(Arc::clone(&manager), 40)).await);

    bitcoin.feed.send(MetricSample::BlockTime(45.0));
    assert!(eventually(|| block_time_score(Arc::clone(&manager), 20)).await);
    assert!(manager.latest_result(&id).unwrap().validation.passes(Metric::BlockTime));

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert!(manager.latest_result(&id).unwrap().validation.passes(Metric::BlockTime));

    tokio::time::sleep(Duration::from_secs(25)).await;
    let failing = eventually(|| {
        let manager = Arc::clone(&manager);
        let id = id.clone();
        async move {
            manager.latest_result(&id).is_some_and(|r| !r.validation.passes(Metric::BlockTime))
        }
    })
    .await;
    assert!(failing);

    bitcoin.feed.send(MetricSample::BlockTime(12.0));
    let recovered = eventually(|| {
        let manager = Arc::clone(&manager);
        let id = id.clone();
        async move {
            manager.latest_result(&id).is_some_and(|r| r.validation.passes(Metric::BlockTime))
        }
    })
    .await;
    assert!(recovered);
    manager.shutdown().await;
}
