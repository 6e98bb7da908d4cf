use clap::{Parser, Subcommand};
use pivot_core::config::{AppConfig, DEFAULT_CONFIG_PATH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod simulation;

use commands::{handle_config_command, run, ConfigCommands, RunArgs};

#[derive(Parser)]
#[command(name = "pivot-cli")]
#[command(about = "Pivot CLI - chain scoring and switchover control loop")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(short, long, global = true, env = "PIVOT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control loop against simulated chains
    Run(RunArgs),

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Initializes tracing with the configured format.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" || env_filter == "trace" {
            EnvFilter::new(format!("warn,pivot_core={env_filter},cli={env_filter}"))
        } else {
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn,pivot_core=debug,cli=debug"))
        }
    } else {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,pivot_core={level},cli={level}"))
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = AppConfig::from_file(&cli.config)?;
            init_logging(&config);
            run(&config, args).await?;
        }

        Commands::Config(config_command) => {
            handle_config_command(config_command, &cli.config)?;
        }
    }

    Ok(())
}
