// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Broadcast loop
//!
//! Repeatedly puts the agent's current datum on the medium while the
//! broadcasting flag is up:
//!
//! - mode ZERO: our own belief entry, then (with relaying enabled) every
//!   known peer entry with its original timestamp
//! - mode ONE: the action datum for the current state
//!
//! The mode is re-read before every send so a switch to ONE cuts a relay
//! round short. Send failures are counted and logged, never fatal.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::agent::SwarmAgent;
use crate::domain::action_state::BroadcastMode;
use crate::domain::message::SwarmMessage;
use crate::domain::transport::Transport;

pub struct BroadcastLoop {
    agent: Arc<SwarmAgent>,
    transport: Arc<dyn Transport>,
    interval: Duration,
    relay_peer_beliefs: bool,
    broadcasting: CancellationToken,
}

impl BroadcastLoop {
    pub fn new(
        agent: Arc<SwarmAgent>,
        transport: Arc<dyn Transport>,
        interval: Duration,
        relay_peer_beliefs: bool,
        broadcasting: CancellationToken,
    ) -> Self {
        Self {
            agent,
            transport,
            interval,
            relay_peer_beliefs,
            broadcasting,
        }
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            agent_id = %self.agent.id(),
            interval_ms = self.interval.as_millis() as u64,
            relay = self.relay_peer_beliefs,
            "Starting broadcast loop"
        );

        while !self.broadcasting.is_cancelled() {
            self.broadcast_round().await;

            if self.interval.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.broadcasting.cancelled() => break,
            }
        }

        info!(agent_id = %self.agent.id(), "Broadcast loop stopped");
    }

    /// One pass over what the current mode asks us to send.
    pub async fn broadcast_round(&self) -> usize {
        match self.agent.broadcast_mode() {
            BroadcastMode::One => {
                let message = self.agent.action_message();
                usize::from(self.send(&message).await)
            }
            BroadcastMode::Zero => {
                let mut sent = 0;
                if let Some(own) = self.agent.own_belief_message() {
                    sent += usize::from(self.send(&own).await);
                }
                if self.relay_peer_beliefs {
                    let own_id = self.agent.id();
                    for (source, entry) in self.agent.beliefs().snapshot() {
                        if source == own_id {
                            continue;
                        }
                        if self.agent.broadcast_mode() != BroadcastMode::Zero || self.broadcasting.is_cancelled() {
                            break;
                        }
                        let relayed = SwarmMessage::belief(source, entry.timestamp, entry.value);
                        sent += usize::from(self.send(&relayed).await);
                    }
                }
                sent
            }
        }
    }

    async fn send(&self, message: &SwarmMessage) -> bool {
        match self.transport.broadcast(&message.encode()).await {
            Ok(()) => {
                debug!(agent_id = %self.agent.id(), datum = %message, "Broadcast");
                true
            }
            Err(e) => {
                metrics::counter!("swarm_broadcast_failures_total").increment(1);
                warn!(agent_id = %self.agent.id(), "Broadcast failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_state::ForcedState;
    use crate::domain::agent::AgentId;
    use crate::domain::node_config::SwarmParameters;
    use crate::domain::notification::NoopNotifier;
    use crate::domain::transport::TransportError;
    use crate::infrastructure::event_bus::EventBus;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn broadcast(&self, payload: &[u8]) -> Result<(), TransportError> {
            self.sent.lock().push(String::from_utf8_lossy(payload).into_owned());
            Ok(())
        }

        async fn recv(&self) -> Result<Vec<u8>, TransportError> {
            std::future::pending().await
        }
    }

    struct TimingOutTransport;

    #[async_trait]
    impl Transport for TimingOutTransport {
        async fn broadcast(&self, _payload: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::Timeout(500))
        }

        async fn recv(&self) -> Result<Vec<u8>, TransportError> {
            std::future::pending().await
        }
    }

    fn agent() -> Arc<SwarmAgent> {
        Arc::new(SwarmAgent::new(
            AgentId(1),
            SwarmParameters::default(),
            Arc::new(NoopNotifier),
            EventBus::new(16),
        ))
    }

    fn broadcast_loop(agent: Arc<SwarmAgent>, transport: Arc<dyn Transport>, relay: bool) -> BroadcastLoop {
        BroadcastLoop::new(agent, transport, Duration::from_millis(50), relay, CancellationToken::new())
    }

    #[test]
    fn test_nothing_sent_before_first_tick() {
        let transport = Arc::new(RecordingTransport::default());
        let looper = broadcast_loop(agent(), transport.clone(), false);
        assert_eq!(tokio_test::block_on(looper.broadcast_round()), 0);
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_mode_zero_sends_own_belief_and_relays() {
        let agent = agent();
        agent.accept_belief(AgentId(2), 3, 0.4);
        agent.advance_tick();

        let transport = Arc::new(RecordingTransport::default());
        broadcast_loop(agent.clone(), transport.clone(), false).broadcast_round().await;
        assert_eq!(*transport.sent.lock(), vec!["0 1 1 0.65".to_string()]);

        let transport = Arc::new(RecordingTransport::default());
        broadcast_loop(agent, transport.clone(), true).broadcast_round().await;
        assert_eq!(
            *transport.sent.lock(),
            vec!["0 1 1 0.65".to_string(), "0 2 3 0.40".to_string()]
        );
    }

    #[tokio::test]
    async fn test_mode_one_sends_action_datum() {
        let agent = agent();
        agent.queue_forced_state(ForcedState::Start { d: 0.91 });
        agent.advance_tick();

        let transport = Arc::new(RecordingTransport::default());
        broadcast_loop(agent, transport.clone(), true).broadcast_round().await;
        assert_eq!(*transport.sent.lock(), vec!["1 1 0.91".to_string()]);
    }

    #[test]
    fn test_send_failures_are_not_fatal() {
        let agent = agent();
        agent.advance_tick();
        let looper = broadcast_loop(agent, Arc::new(TimingOutTransport), false);
        assert_eq!(tokio_test::block_on(looper.broadcast_round()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_when_flag_cleared() {
        let agent = agent();
        agent.advance_tick();
        let transport = Arc::new(RecordingTransport::default());
        let flag = CancellationToken::new();
        let handle = BroadcastLoop::new(agent, transport.clone(), Duration::from_millis(50), false, flag.clone()).start();

        tokio::time::sleep(Duration::from_millis(120)).await;
        flag.cancel();
        handle.await.unwrap();

        // Rounds at 0, 50 and 100 ms
        assert_eq!(transport.sent.lock().len(), 3);
    }
}
