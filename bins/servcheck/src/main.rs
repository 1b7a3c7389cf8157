use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::info;

use servcheck_common::SuiteName;
use servcheck_config::HarnessConfig;
use servcheck_harness::{cancel_on_signal, Harness, LoadOverrides, RunPlan, SuitePlan};

/// Harness configuration picked up from the current directory when present.
const DEFAULT_CONFIG_FILE: &str = "harness.yaml";

/// servcheck - integration and load testing for a config-driven HTTP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Harness configuration file (YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Server binary (overrides config)
    #[arg(long, value_name = "PATH", global = true)]
    server_bin: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run scenario suites, each against its own server instance
    Suites {
        /// Only run the named suite (repeatable)
        #[arg(long = "suite", value_name = "NAME")]
        suites: Vec<String>,

        /// Suite file or directory (defaults to the configured suites_dir)
        path: Option<PathBuf>,
    },
    /// Run the load test and apply the availability gate
    Load {
        /// Repetitions per connection; out-of-range values fall back to 100
        #[arg(long, allow_negative_numbers = true)]
        reps: Option<i64>,

        /// Benchmark client binary
        #[arg(long, value_name = "BIN")]
        client: Option<PathBuf>,

        /// Target URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Check that every invalid configuration is rejected with exit code 1
    CheckConfigs {
        /// Directory of invalid configurations (defaults to invalid_configs_dir)
        dir: Option<PathBuf>,
    },
    /// Config validation, all suites, then the load test
    All,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(binary) = args.server_bin {
        config.server.binary = binary;
    }
    info!("Server binary: {}", config.server.binary.display());

    let plan = build_plan(args.command, &config);
    let harness = Harness::new(config);

    let cancel = CancellationToken::new();
    let listener = cancel_on_signal(cancel.clone());

    let summary = harness.run(&plan, &cancel).await;

    // Releases the signal listener
    cancel.cancel();
    let _ = listener.await;

    println!("{}", summary);
    Ok(ExitCode::from(summary.exit_code() as u8))
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load_from_file(path)
            .with_context(|| format!("Failed to load harness config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            info!("Using {}", DEFAULT_CONFIG_FILE);
            HarnessConfig::load_from_file(DEFAULT_CONFIG_FILE)
        }
        None => Ok(HarnessConfig::default()),
    }
}

fn build_plan(command: Command, config: &HarnessConfig) -> RunPlan {
    match command {
        Command::Suites { suites, path } => RunPlan {
            suites: Some(SuitePlan {
                path: path.unwrap_or_else(|| config.suites_dir.clone()),
                names: suites.into_iter().map(SuiteName::from).collect(),
            }),
            ..RunPlan::default()
        },
        Command::Load { reps, client, url } => RunPlan {
            load: Some(LoadOverrides {
                repetitions: reps,
                client,
                target_url: url,
            }),
            ..RunPlan::default()
        },
        Command::CheckConfigs { dir } => RunPlan {
            check_configs: Some(dir.unwrap_or_else(|| config.invalid_configs_dir.clone())),
            ..RunPlan::default()
        },
        Command::All => RunPlan::all(config),
    }
}
