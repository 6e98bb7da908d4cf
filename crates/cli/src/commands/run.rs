use crate::simulation::simulated_chain;
use chrono::{TimeDelta, Utc};
use clap::Args;
use futures::StreamExt;
use pivot_core::{config::AppConfig, SwitchoverManager, SwitchoverSuggestion};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

/// Hours of history migrated by an automatic switchover.
const MIGRATION_SPAN_HOURS: i64 = 24;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many seconds (runs until Ctrl+C when omitted)
    #[arg(long)]
    pub duration_seconds: Option<u64>,

    /// Perform every suggested switchover, migrating the last 24 hours of data
    #[arg(long)]
    pub auto_switch: bool,

    /// Seed for the simulated metric sources (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Milliseconds between two simulated application writes (0 disables writes)
    #[arg(long, default_value = "1000")]
    pub write_interval_ms: u64,
}

pub async fn run(config: &AppConfig, args: RunArgs) -> CliResult<()> {
    config.validate()?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let window = config.eviction_window();
    let mut builder = SwitchoverManager::builder()
        .ranking_settings(config.ranking_settings()?)
        .validation_settings(config.validation_settings());
    for (offset, chain) in (0u64..).zip(&config.chains) {
        let descriptor = simulated_chain(chain, window.clone(), seed.wrapping_add(offset))?;
        builder = builder.add_chain(descriptor);
    }
    if let Some(initial) = config.initial_chain_id() {
        builder = builder.initial_chain(initial);
    }
    let manager = Arc::new(builder.build()?);

    print_info(&format!(
        "Simulating {} chains (seed {seed}), writing to {}",
        manager.chains().len(),
        manager.current_chain().id()
    ));

    let write_period = Duration::from_millis(args.write_interval_ms);
    let writer =
        (!write_period.is_zero()).then(|| spawn_writer(Arc::clone(&manager), write_period));

    let deadline = args.duration_seconds.map(Duration::from_secs);
    let sleep = tokio::time::sleep(deadline.unwrap_or(Duration::MAX));
    tokio::pin!(sleep);

    let mut suggestions = manager.suggestions();
    let mut switches = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                print_info("Interrupted");
                break;
            }
            () = &mut sleep, if deadline.is_some() => {
                print_info("Run duration elapsed");
                break;
            }
            suggestion = suggestions.next() => {
                let Some(suggestion) = suggestion else { break };
                report(&suggestion);
                if args.auto_switch {
                    let to = Utc::now();
                    let from = to - TimeDelta::hours(MIGRATION_SPAN_HOURS);
                    match manager.apply(&suggestion, from, to).await {
                        Ok(()) => {
                            switches += 1;
                            print_success(&format!("Now writing to {}", suggestion.next_chain()));
                        }
                        Err(e) => print_error(&CliError::from(e).to_string()),
                    }
                }
            }
        }
    }

    if let Some(writer) = writer {
        writer.abort();
    }
    manager.shutdown().await;

    println!("\nRun Summary:");
    println!("  Current chain: {}", manager.current_chain().id());
    println!("  Switchovers: {switches}");
    Ok(())
}

fn report(suggestion: &SwitchoverSuggestion) {
    println!(
        "Suggestion: {} ({}) -> {} ({}), gain {}",
        suggestion.current_chain(),
        suggestion.current.overall_score(),
        suggestion.next_chain(),
        suggestion.next.overall_score(),
        suggestion.score_gain()
    );
    let failing = suggestion.current.validation.failing();
    if !failing.is_empty() {
        let names: Vec<&str> = failing.iter().map(|m| m.as_str()).collect();
        println!("  current chain failing: {}", names.join(", "));
    }
}

/// Periodically writes a numbered payload, the way an application would.
fn spawn_writer(manager: Arc<SwitchoverManager>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut shutdown_rx = manager.shutdown_receiver();
        let mut sequence = 0u64;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    sequence += 1;
                    let payload = format!("entry-{sequence}@{}", Utc::now().to_rfc3339());
                    match manager.write_data(payload).await {
                        Ok(()) => debug!(sequence, "simulated write accepted"),
                        Err(e) => warn!(sequence, error = %e, "simulated write failed"),
                    }
                }
            }
        }
    })
}
