// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Headless action monitor.
//!
//! Accepts one TCP connection per agent and keeps the latest action state
//! reported by each. A record replaces the previous record of the same agent.

use crate::domain::agent::AgentId;
use crate::domain::notification::ActionNotification;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Default)]
pub struct SupervisorMonitor {
    table: RwLock<HashMap<AgentId, bool>>,
}

impl SupervisorMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record. Returns true when the agent's state changed.
    pub fn record(&self, notification: ActionNotification) -> bool {
        let acting = notification.acting();
        let previous = self.table.write().insert(notification.agent_id, acting);
        previous != Some(acting)
    }

    pub fn state_of(&self, agent_id: AgentId) -> Option<bool> {
        self.table.read().get(&agent_id).copied()
    }

    /// `(agent, acting)` pairs ordered by agent.
    pub fn snapshot(&self) -> Vec<(AgentId, bool)> {
        let mut rows: Vec<_> = self.table.read().iter().map(|(id, acting)| (*id, *acting)).collect();
        rows.sort_by_key(|(id, _)| *id);
        rows
    }

    pub fn acting_count(&self) -> usize {
        self.table.read().values().filter(|acting| **acting).count()
    }

    pub fn known_agents(&self) -> usize {
        self.table.read().len()
    }

    /// Accept agent connections until cancelled.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        cancellation_token: CancellationToken,
    ) -> std::io::Result<()> {
        info!("Action monitor listening on {}", listener.local_addr()?);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Action monitor shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    info!("Agent connected from {}", peer);
                    let monitor = self.clone();
                    let token = cancellation_token.clone();
                    tokio::spawn(async move {
                        monitor.handle_connection(stream, peer, token).await;
                    });
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, cancellation_token: CancellationToken) {
        let mut lines = BufReader::new(stream).lines();

        loop {
            let line = tokio::select! {
                _ = cancellation_token.cancelled() => return,
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ActionNotification>(&line) {
                        Ok(notification) => self.on_notification(notification),
                        Err(e) => warn!("Malformed record from {}: {}", peer, e),
                    }
                }
                Ok(None) => {
                    info!("Agent at {} disconnected", peer);
                    return;
                }
                Err(e) => {
                    warn!("Connection with {} failed: {}", peer, e);
                    return;
                }
            }
        }
    }

    fn on_notification(&self, notification: ActionNotification) {
        if self.record(notification) {
            info!(
                agent_id = %notification.agent_id,
                acting = notification.acting(),
                "Agent {} {}",
                notification.agent_id,
                if notification.acting() { "started acting" } else { "stopped acting" }
            );
            info!(
                "{} of {} known agents acting",
                self.acting_count(),
                self.known_agents()
            );
        } else {
            debug!(agent_id = %notification.agent_id, "Repeated action state");
        }
    }
}
