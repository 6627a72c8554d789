// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `swarm-agent run` - one agent over UDP broadcast

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use swarm_core::application::{NodeSettings, SwarmAgent, SwarmNode};
use swarm_core::domain::agent::AgentId;
use swarm_core::domain::node_config::AgentConfigManifest;
use swarm_core::domain::notification::{ActionNotifier, NoopNotifier};
use swarm_core::infrastructure::event_bus::EventBus;
use swarm_core::infrastructure::simulated_field::SimulatedField;
use swarm_core::infrastructure::supervisor_client::SupervisorClient;
use swarm_core::infrastructure::udp_transport::UdpTransport;

#[derive(Args)]
pub struct RunArgs {
    /// Agent identifier (default: derived from the local address)
    #[arg(long)]
    id: Option<u32>,

    /// Rebroadcast known peer beliefs while broadcasting beliefs
    #[arg(long)]
    relay: bool,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut manifest = AgentConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    if let Some(id) = args.id {
        manifest.spec.node.id = Some(id);
    }
    if args.relay {
        manifest.spec.transport.relay_peer_beliefs = true;
    }
    manifest.validate().context("Configuration validation failed")?;

    let spec = &manifest.spec;
    crate::init_metrics(spec.observability.as_ref().and_then(|o| o.metrics.as_ref()))?;

    let transport = UdpTransport::bind(&spec.transport)
        .await
        .context("Failed to open the broadcast transport")?;
    let agent_id = spec
        .node
        .id
        .map(AgentId::new)
        .unwrap_or_else(|| transport.agent_id());

    let token = CancellationToken::new();
    let notifier: Arc<dyn ActionNotifier> = match &spec.supervisor {
        Some(supervisor) => Arc::new(SupervisorClient::connect(supervisor, token.clone()).await),
        None => Arc::new(NoopNotifier),
    };

    let params = spec.consensus.clone();
    let field = SimulatedField::new(spec.sensing.simulated_prevalence, params.world_cells());
    let agent = Arc::new(SwarmAgent::new(
        agent_id,
        params,
        notifier,
        EventBus::with_default_capacity(),
    ));

    info!(
        agent_id = %agent_id,
        node = %manifest.metadata.name,
        swarm_size = agent.params().swarm_size,
        "Starting swarm agent"
    );

    let node = SwarmNode::spawn(
        agent,
        Arc::new(transport),
        Arc::new(field),
        NodeSettings::from_spec(spec),
    );

    crate::shutdown_signal().await;

    node.stop_moving();
    node.stop_broadcasting();
    node.shutdown().await;
    token.cancel();

    Ok(())
}
