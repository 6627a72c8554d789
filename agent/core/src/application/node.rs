// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm node runtime
//!
//! Wires one [`SwarmAgent`] to its transport and field and owns the four
//! background tasks. Two flags control them independently:
//!
//! - `broadcasting` stops the broadcast loop
//! - `movement` stops the action-cycle driver
//!
//! [`SwarmNode::shutdown`] lowers both and stops the tick loop and the
//! receive handler.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::action_cycle::ActionCycleDriver;
use crate::application::agent::SwarmAgent;
use crate::application::broadcast_loop::BroadcastLoop;
use crate::application::receive_handler::ReceiveHandler;
use crate::application::tick_loop::{TickLoop, DEFAULT_TICK_PERIOD};
use crate::domain::field::FieldInterface;
use crate::domain::node_config::AgentConfigSpec;
use crate::domain::transport::Transport;

/// Timing of the background tasks.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub tick_period: Duration,
    pub broadcast_interval: Duration,
    pub relay_peer_beliefs: bool,
    pub sample_interval: Duration,
    pub samples_per_cycle: u32,
}

impl NodeSettings {
    pub fn from_spec(spec: &AgentConfigSpec) -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            broadcast_interval: Duration::from_millis(spec.transport.broadcast_interval_ms),
            relay_peer_beliefs: spec.transport.relay_peer_beliefs,
            sample_interval: Duration::from_millis(spec.sensing.sample_interval_ms),
            samples_per_cycle: spec.sensing.samples_per_cycle,
        }
    }
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self::from_spec(&AgentConfigSpec::default())
    }
}

pub struct SwarmNode {
    agent: Arc<SwarmAgent>,
    broadcasting: CancellationToken,
    movement: CancellationToken,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl SwarmNode {
    /// Start all background tasks. Must be called inside a tokio runtime.
    pub fn spawn(
        agent: Arc<SwarmAgent>,
        transport: Arc<dyn Transport>,
        field: Arc<dyn FieldInterface>,
        settings: NodeSettings,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let broadcasting = shutdown.child_token();
        let movement = shutdown.child_token();

        let handles = vec![
            TickLoop::new(agent.clone(), settings.tick_period, shutdown.clone()).start(),
            ReceiveHandler::new(agent.clone()).start(transport.clone(), shutdown.clone()),
            BroadcastLoop::new(
                agent.clone(),
                transport,
                settings.broadcast_interval,
                settings.relay_peer_beliefs,
                broadcasting.clone(),
            )
            .start(),
            ActionCycleDriver::new(
                agent.clone(),
                field,
                settings.sample_interval,
                settings.samples_per_cycle,
                movement.clone(),
            )
            .start(),
        ];

        info!(agent_id = %agent.id(), "Swarm node started");

        Self {
            agent,
            broadcasting,
            movement,
            shutdown,
            handles,
        }
    }

    pub fn agent(&self) -> &Arc<SwarmAgent> {
        &self.agent
    }

    pub fn stop_broadcasting(&self) {
        self.broadcasting.cancel();
    }

    pub fn stop_moving(&self) {
        self.movement.cancel();
    }

    pub fn is_broadcasting(&self) -> bool {
        !self.broadcasting.is_cancelled()
    }

    pub fn is_moving(&self) -> bool {
        !self.movement.is_cancelled()
    }

    /// Token cancelled when the whole node stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Node task ended abnormally: {}", e);
            }
        }
        info!(agent_id = %self.agent.id(), "Swarm node stopped");
    }
}
