//! Integration tests for switchover execution.
//!
//! These tests drive [`SwitchoverManager::switch_over`] against gated in-memory ledgers so a
//! migration can be frozen right after it enters the migrating phase. They verify that:
//! - Writes issued during a migration are buffered and delivered exactly once, in order
//! - A failed migration leaves the original chain current and replays buffered writes to it
//! - A replay failure reports exactly the entries that never reached a chain
//! - Cancelling a migration halfway still restores the normal phase
//! - Cancelling during the buffer flush neither loses nor reorders buffered writes
//! - Concurrent switchovers are serialized

use crate::mock_infrastructure::{block_time_ranking, eventually, last_day, test_chain, TestChain};
use chrono::{TimeDelta, Utc};
use pivot_core::{
    errors::LedgerError, settings::ValidationSettings, ChainId, Phase, SwitchoverError,
    SwitchoverManager,
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;

fn chains() -> (TestChain, TestChain) {
    let bitcoin = test_chain("Bitcoin", 6, 8).unwrap();
    let ethereum = test_chain("Ethereum", 12, 10).unwrap();
    let now = Utc::now();
    bitcoin.ledger.store().insert_at(now - TimeDelta::hours(30), "expired");
    bitcoin.ledger.store().insert_at(now - TimeDelta::hours(2), "old-1");
    bitcoin.ledger.store().insert_at(now - TimeDelta::hours(1), "old-2");
    (bitcoin, ethereum)
}

fn manager(chains: &[&TestChain], initial: &str) -> Arc<SwitchoverManager> {
    let manager = SwitchoverManager::builder()
        .add_chains(chains.iter().map(|c| Arc::clone(&c.descriptor)))
        .ranking_settings(block_time_ranking(Duration::ZERO).unwrap())
        .validation_settings(ValidationSettings::new())
        .initial_chain(initial)
        .build()
        .unwrap();
    Arc::new(manager)
}

/// Starts a switchover on a background task.
fn spawn_switch(
    manager: &Arc<SwitchoverManager>,
    next: &str,
) -> tokio::task::JoinHandle<Result<(), SwitchoverError>> {
    let manager = Arc::clone(manager);
    let next = ChainId::new(next);
    let (from, to) = last_day();
    tokio::spawn(async move { manager.switch_over(&next, from, to).await })
}

#[tokio::test]
async fn test_writes_during_migration_are_delivered_after_history() {
    let (bitcoin, ethereum) = chains();
    bitcoin.ledger.hold_reads();
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let switch = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    assert_eq!(manager.phase().await, Phase::Migrating);

    manager.write_data("new-1").await.unwrap();
    manager.write_data("new-2").await.unwrap();
    assert_eq!(manager.buffered_len().await, 2);
    assert!(ethereum.ledger.entries().is_empty());

    bitcoin.ledger.release_read();
    timeout(Duration::from_secs(5), switch).await.unwrap().unwrap().unwrap();

    assert_eq!(ethereum.ledger.entries(), vec!["old-1", "old-2", "new-1", "new-2"]);
    assert_eq!(bitcoin.ledger.entries(), vec!["expired", "old-1", "old-2"]);
    assert_eq!(manager.current_chain().id().as_str(), "Ethereum");
    assert_eq!(manager.phase().await, Phase::Normal);
    assert_eq!(manager.buffered_len().await, 0);

    manager.write_data("after").await.unwrap();
    assert_eq!(ethereum.ledger.entries().last().map(String::as_str), Some("after"));
    manager.shutdown().await;
}

#[tokio::test]
async fn test_failed_batch_write_replays_buffer_to_original_chain() {
    let (bitcoin, ethereum) = chains();
    bitcoin.ledger.hold_reads();
    ethereum.ledger.store().fail_writes(true);
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let switch = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    manager.write_data("x").await.unwrap();
    manager.write_data("y").await.unwrap();
    bitcoin.ledger.release_read();

    let err = timeout(Duration::from_secs(5), switch).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(
        err,
        SwitchoverError::MigrationFailed { source: LedgerError::WriteFailed { .. }, .. }
    ));
    assert!(err.undelivered().is_empty());

    assert_eq!(manager.current_chain().id().as_str(), "Bitcoin");
    assert_eq!(manager.phase().await, Phase::Normal);
    assert_eq!(bitcoin.ledger.entries(), vec!["expired", "old-1", "old-2", "x", "y"]);
    assert!(ethereum.ledger.entries().is_empty());
    manager.shutdown().await;
}

#[tokio::test]
async fn test_failed_read_reports_entries_the_original_chain_rejected() {
    let (bitcoin, ethereum) = chains();
    bitcoin.ledger.hold_reads();
    bitcoin.ledger.store().fail_next_read();
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let switch = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    manager.write_data("x").await.unwrap();
    manager.write_data("y").await.unwrap();
    manager.write_data("z").await.unwrap();
    bitcoin.ledger.store().fail_writes_after(1);
    bitcoin.ledger.release_read();

    let err = timeout(Duration::from_secs(5), switch).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(
        err,
        SwitchoverError::MigrationFailed { source: LedgerError::ReadFailed { .. }, .. }
    ));
    assert_eq!(err.undelivered(), ["y", "z"]);
    assert_eq!(bitcoin.ledger.entries(), vec!["expired", "old-1", "old-2", "x"]);
    assert_eq!(manager.current_chain().id().as_str(), "Bitcoin");
    assert_eq!(manager.buffered_len().await, 0);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_replay_failure_after_commit_keeps_new_chain() {
    let (bitcoin, ethereum) = chains();
    bitcoin.ledger.hold_reads();
    ethereum.ledger.store().fail_writes_after(2);
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let switch = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    manager.write_data("x").await.unwrap();
    manager.write_data("y").await.unwrap();
    bitcoin.ledger.release_read();

    let err = timeout(Duration::from_secs(5), switch).await.unwrap().unwrap().unwrap_err();
    assert!(matches!(err, SwitchoverError::ReplayFailed { .. }));
    assert_eq!(err.undelivered(), ["x", "y"]);
    assert_eq!(ethereum.ledger.entries(), vec!["old-1", "old-2"]);
    assert_eq!(manager.current_chain().id().as_str(), "Ethereum");
    assert_eq!(manager.phase().await, Phase::Normal);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_cancelled_migration_restores_normal_phase() {
    let (bitcoin, ethereum) = chains();
    bitcoin.ledger.hold_reads();
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let switch = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    manager.write_data("x").await.unwrap();

    switch.abort();
    assert!(switch.await.unwrap_err().is_cancelled());

    let restored = eventually(|| {
        let manager = Arc::clone(&manager);
        async move { manager.phase().await == Phase::Normal && manager.buffered_len().await == 0 }
    })
    .await;
    assert!(restored);
    assert_eq!(manager.current_chain().id().as_str(), "Bitcoin");
    assert_eq!(bitcoin.ledger.entries(), vec!["expired", "old-1", "old-2", "x"]);

    // The next attempt is not blocked by the abandoned one.
    bitcoin.ledger.release_read();
    let (from, to) = last_day();
    manager.switch_over(&ChainId::new("Ethereum"), from, to).await.unwrap();
    assert_eq!(ethereum.ledger.entries(), vec!["old-1", "old-2", "x"]);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_cancel_during_buffer_flush_keeps_order() {
    let (bitcoin, ethereum) = chains();
    bitcoin.ledger.hold_reads();
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let switch = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    manager.write_data("x").await.unwrap();
    manager.write_data("y").await.unwrap();
    manager.write_data("z").await.unwrap();
    ethereum.ledger.hold_writes();
    bitcoin.ledger.release_read();

    // "x" is flushed, then the migration is cancelled while "y" is in flight.
    timeout(Duration::from_secs(5), ethereum.ledger.write_started()).await.unwrap();
    ethereum.ledger.release_writes(1);
    timeout(Duration::from_secs(5), ethereum.ledger.write_started()).await.unwrap();
    switch.abort();
    assert!(switch.await.unwrap_err().is_cancelled());

    ethereum.ledger.release_writes(3);
    timeout(Duration::from_secs(5), manager.write_data("w")).await.unwrap().unwrap();

    let settled = eventually(|| {
        let manager = Arc::clone(&manager);
        async move { manager.phase().await == Phase::Normal && manager.buffered_len().await == 0 }
    })
    .await;
    assert!(settled);
    assert_eq!(manager.current_chain().id().as_str(), "Ethereum");
    assert_eq!(ethereum.ledger.entries(), vec!["old-1", "old-2", "x", "y", "z", "w"]);
    assert_eq!(bitcoin.ledger.entries(), vec!["expired", "old-1", "old-2"]);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_switchovers_are_serialized() {
    let (bitcoin, ethereum) = chains();
    let classic = test_chain("Ethereum Classic", 12, 7).unwrap();
    bitcoin.ledger.hold_reads();
    let manager = manager(&[&bitcoin, &ethereum, &classic], "Bitcoin");

    let first = spawn_switch(&manager, "Ethereum");
    timeout(Duration::from_secs(5), bitcoin.ledger.read_started()).await.unwrap();
    let second = spawn_switch(&manager, "Ethereum Classic");

    tokio::task::yield_now().await;
    assert!(classic.ledger.entries().is_empty());

    bitcoin.ledger.release_read();
    timeout(Duration::from_secs(5), first).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(5), second).await.unwrap().unwrap().unwrap();

    // The second switchover started from the chain the first one committed to.
    assert_eq!(manager.current_chain().id().as_str(), "Ethereum Classic");
    assert_eq!(ethereum.ledger.entries(), vec!["old-1", "old-2"]);
    assert_eq!(classic.ledger.entries(), vec!["old-1", "old-2"]);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_switch_to_current_chain_is_rejected() {
    let (bitcoin, ethereum) = chains();
    let manager = manager(&[&bitcoin, &ethereum], "Bitcoin");

    let (from, to) = last_day();
    let err = manager.switch_over(&ChainId::new("Bitcoin"), from, to).await.unwrap_err();
    assert!(matches!(err, SwitchoverError::AlreadyActive(id) if id.as_str() == "Bitcoin"));
    assert!(ethereum.ledger.entries().is_empty());
    manager.shutdown().await;
}
