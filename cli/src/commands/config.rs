// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use swarm_core::domain::node_config::{
    AgentConfigManifest, LoggingConfig, MetricsConfig, ObservabilityConfig, SupervisorConfig,
};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./swarm-agent.yaml)
        #[arg(short, long, default_value = "./swarm-agent.yaml")]
        output: PathBuf,

        /// Include the optional supervisor and observability sections
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = AgentConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. SWARM_AGENT_CONFIG: {}",
            std::env::var("SWARM_AGENT_CONFIG")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./swarm-agent.yaml");
        println!("  4. ~/.swarm-agent/config.yaml");
        println!("  5. /etc/swarm-agent/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    let spec = &config.spec;
    println!("{}", "Node:".bold());
    println!("  Name: {}", config.metadata.name);
    match spec.node.id {
        Some(id) => println!("  ID: {}", id),
        None => println!("  ID: {}", "(derived from local address)".dimmed()),
    }
    println!();

    let consensus = &spec.consensus;
    println!("{}", "Consensus:".bold());
    println!("  Start threshold: {}", consensus.phi_threshold);
    println!("  Stop threshold: {}", consensus.not_phi_threshold);
    println!("  Neutral belief: {}", consensus.neutral_belief);
    println!("  Swarm size: {}", consensus.swarm_size);
    println!("  Action broadcast duration: {} ticks", consensus.action_broadcast_duration);
    println!("  Memory size: {}", consensus.memory_size);
    println!(
        "  Decay model: activation {} × density {} → target {}",
        consensus.activation_rate, consensus.swarm_density, consensus.target_threshold
    );
    println!();

    let transport = &spec.transport;
    println!("{}", "Transport:".bold());
    println!("  Bind: {}:{}", transport.bind_address, transport.port);
    println!("  Broadcast: {}:{}", transport.broadcast_address, transport.port);
    println!("  Interval: {} ms", transport.broadcast_interval_ms);
    println!("  Relay peer beliefs: {}", transport.relay_peer_beliefs);
    println!();

    println!("{}", "Supervisor:".bold());
    match &spec.supervisor {
        Some(supervisor) => println!("  Address: {}", supervisor.address),
        None => println!("  {}", "(disabled)".dimmed()),
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = AgentConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    sample_manifest(with_examples)
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_manifest(with_examples: bool) -> AgentConfigManifest {
    let mut manifest = AgentConfigManifest::default();
    if with_examples {
        manifest.spec.supervisor = Some(SupervisorConfig {
            address: "192.168.1.10:47001".to_string(),
            connect_timeout_ms: 2000,
        });
        manifest.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            }),
            metrics: Some(MetricsConfig {
                enabled: true,
                port: 9090,
            }),
        });
    }
    manifest
}
