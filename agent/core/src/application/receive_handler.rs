// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Receive handler - turns inbound datums into state updates
//!
//! Belief datums go straight into the belief store. Action datums are left in
//! the pending slot for the tick loop. Anything that does not decode is
//! counted and dropped without touching agent state.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::agent::SwarmAgent;
use crate::domain::belief::UpsertOutcome;
use crate::domain::message::{CodecError, SwarmMessage};
use crate::domain::transport::{Transport, TransportError};

/// What became of one inbound datum.
#[derive(Debug, PartialEq)]
pub enum ReceiveOutcome {
    Belief(UpsertOutcome),
    ActionQueued,
    Malformed(CodecError),
}

pub struct ReceiveHandler {
    agent: Arc<SwarmAgent>,
}

impl ReceiveHandler {
    pub fn new(agent: Arc<SwarmAgent>) -> Self {
        Self { agent }
    }

    pub fn on_datum(&self, payload: &[u8]) -> ReceiveOutcome {
        match SwarmMessage::decode(payload) {
            Ok(SwarmMessage::Belief {
                source,
                timestamp,
                value,
            }) => ReceiveOutcome::Belief(self.agent.accept_belief(source, timestamp, value)),
            Ok(SwarmMessage::Action(forced)) => {
                self.agent.queue_forced_state(forced);
                ReceiveOutcome::ActionQueued
            }
            Err(e) => {
                metrics::counter!("swarm_messages_malformed_total").increment(1);
                debug!(
                    agent_id = %self.agent.id(),
                    payload = %String::from_utf8_lossy(payload),
                    "Dropped malformed datum: {}",
                    e
                );
                ReceiveOutcome::Malformed(e)
            }
        }
    }

    /// Feed datums from `transport` until cancelled or the medium closes.
    pub async fn run(&self, transport: Arc<dyn Transport>, shutdown_token: CancellationToken) {
        info!(agent_id = %self.agent.id(), "Starting receive handler");

        loop {
            tokio::select! {
                received = transport.recv() => match received {
                    Ok(payload) => {
                        self.on_datum(&payload);
                    }
                    Err(TransportError::Closed) => {
                        warn!(agent_id = %self.agent.id(), "Transport closed");
                        break;
                    }
                    Err(e) => {
                        warn!(agent_id = %self.agent.id(), "Receive failed: {}", e);
                    }
                },
                _ = shutdown_token.cancelled() => break,
            }
        }

        info!(agent_id = %self.agent.id(), "Receive handler stopped");
    }

    pub fn start(
        self,
        transport: Arc<dyn Transport>,
        shutdown_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(transport, shutdown_token).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_state::ForcedState;
    use crate::domain::agent::AgentId;
    use crate::domain::node_config::SwarmParameters;
    use crate::domain::notification::NoopNotifier;
    use crate::infrastructure::event_bus::EventBus;

    fn handler() -> (Arc<SwarmAgent>, ReceiveHandler) {
        let agent = Arc::new(SwarmAgent::new(
            AgentId(1),
            SwarmParameters::default(),
            Arc::new(NoopNotifier),
            EventBus::new(16),
        ));
        (agent.clone(), ReceiveHandler::new(agent))
    }

    #[test]
    fn test_belief_datum_updates_store() {
        let (agent, handler) = handler();
        assert_eq!(handler.on_datum(b"0 7 42 0.37"), ReceiveOutcome::Belief(UpsertOutcome::Inserted));
        assert_eq!(handler.on_datum(b"0 7 41 0.90"), ReceiveOutcome::Belief(UpsertOutcome::Stale));
        let entry = agent.beliefs().get(AgentId(7)).unwrap();
        assert_eq!(entry.timestamp, 42);
        assert_eq!(entry.value, 0.37);
    }

    #[test]
    fn test_action_datum_lands_in_pending_slot() {
        let (agent, handler) = handler();
        assert_eq!(handler.on_datum(b"1 1 0.82"), ReceiveOutcome::ActionQueued);
        assert_eq!(agent.pending_forced_state(), Some(ForcedState::Start { d: 0.82 }));
        // Not applied until the next tick
        assert!(!agent.is_acting());
    }

    #[test]
    fn test_malformed_datum_changes_nothing() {
        let (agent, handler) = handler();
        for payload in [&b"0 7 abc 0.5"[..], b"", b"2 1 0.5", b"1 5 0.5", b"0 7 1", b"\xff\xfe"] {
            assert!(matches!(handler.on_datum(payload), ReceiveOutcome::Malformed(_)));
        }
        assert_eq!(agent.beliefs().known_sources(), 0);
        assert_eq!(agent.pending_forced_state(), None);
    }

    #[test]
    fn test_out_of_range_belief_is_discarded() {
        let (agent, handler) = handler();
        assert_eq!(handler.on_datum(b"0 3 5 1.50"), ReceiveOutcome::Belief(UpsertOutcome::OutOfRange));
        assert!(agent.beliefs().get(AgentId(3)).is_none());
    }
}
