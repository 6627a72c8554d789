// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Swarm Agent CLI
//!
//! The `swarm-agent` binary runs one agent of a robot swarm, the headless
//! action monitor, or a whole simulated swarm in one process.
//!
//! ## Commands
//!
//! - `swarm-agent run` - Run an agent over UDP broadcast
//! - `swarm-agent monitor` - Receive action states from the agents
//! - `swarm-agent simulate` - Run N agents over an in-memory lossy medium
//! - `swarm-agent config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use swarm_core::domain::node_config::{AgentConfigManifest, LoggingConfig, MetricsConfig};
use tokio::signal;
use tracing::info;

mod commands;

use commands::{ConfigCommand, MonitorArgs, RunArgs, SimulateArgs};

/// Swarm Agent - belief consensus and action coordination
#[derive(Parser)]
#[command(name = "swarm-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SWARM_AGENT_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SWARM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (text, json)
    #[arg(long, global = true, env = "SWARM_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run this node's agent
    #[command(name = "run")]
    Run(RunArgs),

    /// Run the action monitor
    #[command(name = "monitor")]
    Monitor(MonitorArgs),

    /// Simulate a swarm in-process
    #[command(name = "simulate")]
    Simulate(SimulateArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let logging = resolve_logging(&cli);
    init_logging(&logging)?;

    match cli.command {
        Some(Commands::Run(args)) => commands::run::execute(args, cli.config).await,
        Some(Commands::Monitor(args)) => commands::monitor::execute(args).await,
        Some(Commands::Simulate(args)) => commands::simulate::execute(args, cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Flags and environment first, then the config file, then defaults.
fn resolve_logging(cli: &Cli) -> LoggingConfig {
    let configured = AgentConfigManifest::load_or_default(cli.config.clone())
        .ok()
        .and_then(|manifest| manifest.spec.observability)
        .and_then(|observability| observability.logging);

    let level = cli
        .log_level
        .clone()
        .or_else(|| configured.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = cli
        .log_format
        .clone()
        .or_else(|| configured.as_ref().map(|l| l.format.clone()))
        .unwrap_or_else(|| "text".to_string());

    LoggingConfig { level, format }
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}

/// Start the Prometheus exporter when enabled in the configuration.
pub(crate) fn init_metrics(metrics: Option<&MetricsConfig>) -> Result<()> {
    let Some(metrics) = metrics.filter(|m| m.enabled) else {
        return Ok(());
    };

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], metrics.port))
        .install()
        .context("Failed to start Prometheus exporter")?;

    info!("Prometheus metrics exposed on port {}", metrics.port);
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
