use clap::Subcommand;
use pivot_core::{config::AppConfig, Metric};
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

/// Sample configuration written by `config generate`.
pub const SAMPLE_CONFIG: &str = include_str!("../../../../config/pivot.toml");

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration
    Validate,

    /// Show the effective configuration (file plus environment overrides)
    Show {
        /// Print the full configuration as TOML instead of a summary
        #[arg(long)]
        raw: bool,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = pivot_core::config::DEFAULT_CONFIG_PATH)]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands, file: &str) -> CliResult<()> {
    match command {
        ConfigCommands::Validate => validate_config(file),
        ConfigCommands::Show { raw } => show_config(file, raw),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = AppConfig::from_file(file)?;

    print_info("Validating configuration...");
    config.validate()?;
    config.ranking_settings()?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Chains: {}", config.chains.len());
    println!("  Initial chain: {}", config.initial_chain_id().unwrap_or("-"));
    println!("  Suggestion interval: {}s", config.advisor.min_suggestion_interval_seconds);
    println!(
        "  Ranked metrics: {}",
        Metric::ALL.iter().filter(|m| config.ranking.get(**m).is_some()).count()
    );
    println!(
        "  Validated metrics: {}",
        Metric::ALL.iter().filter(|m| config.validation.get(**m).is_some()).count()
    );

    Ok(())
}

fn show_config(file: &str, raw: bool) -> CliResult<()> {
    let config = AppConfig::from_file(file)?;

    if raw {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Configuration from {file}:");

    println!("\n[Chains] ({} chains)", config.chains.len());
    for chain in &config.chains {
        println!(
            "  {}: {} confirmations, reputation {}",
            chain.id, chain.required_confirmations, chain.reputation
        );
    }
    if let Some(initial) = config.initial_chain_id() {
        println!("  Initial: {initial}");
    }

    println!("\n[Ranking]");
    for metric in Metric::ALL {
        if let Some(table) = config.ranking.get(metric) {
            println!(
                "  {metric}: weight {}, {} bands, default {}",
                table.weight,
                table.bands.len(),
                table.default_score
            );
        }
    }

    println!("\n[Validation]");
    for metric in Metric::ALL {
        if let Some(range) = config.validation.get(metric) {
            let min = range.min.map_or_else(|| "-".to_string(), |v| v.to_string());
            let max = range.max.map_or_else(|| "-".to_string(), |v| v.to_string());
            println!("  {metric}: [{min}, {max}], grace {}s", range.grace_seconds);
        }
    }
    if !config.validation.disqualify_on.is_empty() {
        let watched: Vec<&str> =
            config.validation.disqualify_on.iter().map(|m| m.as_str()).collect();
        println!(
            "  Disqualify on {:?} failing: {}",
            config.validation.disqualify_match,
            watched.join(", ")
        );
    }

    println!("\n[Advisor]");
    println!("  Min Suggestion Interval: {}s", config.advisor.min_suggestion_interval_seconds);

    println!("\n[Eviction]");
    println!("  Window: {}s", config.eviction.window_seconds);
    println!("  Tick: {}s", config.eviction.tick_seconds);

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "File {output} already exists. Use --force to overwrite."
        )));
    }

    if let Some(parent) = Path::new(output).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration generated: {output}"));
    print_info("Remember to:");
    print_info("  1. Replace the simulated chains with your own");
    print_info("  2. Tune ranking bands and validation ranges for your use case");

    Ok(())
}
