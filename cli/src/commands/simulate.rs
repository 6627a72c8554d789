// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `swarm-agent simulate` - a whole swarm in one process
//!
//! Every agent gets its own endpoint on a shared lossy medium and works the
//! same simulated field, so the swarm can be watched converging on an action
//! and draining the field until it stops.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use swarm_core::application::{NodeSettings, SwarmAgent, SwarmNode};
use swarm_core::domain::agent::AgentId;
use swarm_core::domain::events::AgentEvent;
use swarm_core::domain::node_config::AgentConfigManifest;
use swarm_core::domain::notification::NoopNotifier;
use swarm_core::infrastructure::event_bus::{EventBus, EventBusError};
use swarm_core::infrastructure::memory_transport::MemoryMedium;
use swarm_core::infrastructure::simulated_field::SimulatedField;

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of agents (default: consensus.swarm_size)
    #[arg(long)]
    agents: Option<usize>,

    /// Probability that an agent misses a datagram
    #[arg(long, default_value_t = 0.1)]
    loss: f64,

    /// Simulated run time in seconds
    #[arg(long, default_value_t = 120)]
    duration: u64,

    /// Initial prevalence of the property (default: sensing.simulated_prevalence)
    #[arg(long)]
    prevalence: Option<f64>,

    /// Seed for the field and the agents' decisions
    #[arg(long)]
    seed: Option<u64>,
}

pub async fn execute(args: SimulateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut manifest = AgentConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    if let Some(agents) = args.agents {
        manifest.spec.consensus.swarm_size = agents;
    }
    if let Some(prevalence) = args.prevalence {
        manifest.spec.sensing.simulated_prevalence = prevalence;
    }
    manifest.validate().context("Configuration validation failed")?;
    if !(0.0..=1.0).contains(&args.loss) {
        anyhow::bail!("--loss must be within [0, 1], got {}", args.loss);
    }

    let spec = &manifest.spec;
    crate::init_metrics(spec.observability.as_ref().and_then(|o| o.metrics.as_ref()))?;

    let params = spec.consensus.clone();
    let mut field = SimulatedField::new(spec.sensing.simulated_prevalence, params.world_cells());
    if let Some(seed) = args.seed {
        field = field.with_seed(seed);
    }
    let field = Arc::new(field);
    let medium = MemoryMedium::new(4096).with_loss_rate(args.loss);
    let event_bus = EventBus::with_default_capacity();
    let printer = tokio::spawn(print_transitions(event_bus.clone()));

    info!(
        agents = params.swarm_size,
        world_cells = params.world_cells(),
        prevalence = field.prevalence(),
        loss = args.loss,
        "Starting simulated swarm"
    );

    let mut nodes = Vec::with_capacity(params.swarm_size);
    for index in 1..=params.swarm_size {
        let mut agent = SwarmAgent::new(
            AgentId::new(index as u32),
            params.clone(),
            Arc::new(NoopNotifier),
            event_bus.clone(),
        );
        if let Some(seed) = args.seed {
            agent = agent.with_rng(StdRng::seed_from_u64(seed.wrapping_add(index as u64)));
        }
        nodes.push(SwarmNode::spawn(
            Arc::new(agent),
            Arc::new(medium.endpoint()),
            field.clone(),
            NodeSettings::from_spec(spec),
        ));
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.duration)) => {
            info!("Simulation time elapsed");
        }
        _ = crate::shutdown_signal() => {}
    }

    let acting: Vec<AgentId> = nodes
        .iter()
        .filter(|node| node.agent().is_acting())
        .map(|node| node.agent().id())
        .collect();
    for node in nodes {
        node.shutdown().await;
    }
    printer.abort();

    println!();
    println!("{}", "Simulation summary:".bold());
    println!("  Agents: {}", params.swarm_size);
    println!("  Remaining prevalence: {:.3}", field.prevalence());
    println!("  Target threshold: {:.3}", params.target_threshold);
    if acting.is_empty() {
        println!("  {}", "No agent acting".green());
    } else {
        let ids: Vec<String> = acting.iter().map(|id| id.to_string()).collect();
        println!("  {} {}", "Still acting:".yellow(), ids.join(", "));
    }

    Ok(())
}

async fn print_transitions(event_bus: EventBus) {
    let mut receiver = event_bus.subscribe();
    loop {
        match receiver.recv().await {
            Ok(AgentEvent::ActionStarted { agent_id, d, cause, tick, .. }) => {
                println!(
                    "{} agent {} started (d = {:.2}, {}) at tick {}",
                    "▶".green(),
                    agent_id,
                    d,
                    cause,
                    tick
                );
            }
            Ok(AgentEvent::ActionStopped { agent_id, cause, tick, .. }) => {
                println!("{} agent {} stopped ({}) at tick {}", "■".yellow(), agent_id, cause, tick);
            }
            Ok(_) | Err(EventBusError::Lagged(_)) | Err(EventBusError::Empty) => {}
            Err(EventBusError::Closed) => break,
        }
    }
}
