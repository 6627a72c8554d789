// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-Memory Broadcast Medium
//
// A shared tokio broadcast channel standing in for the radio. Each endpoint
// sees every datagram except its own, and drops each one independently with
// the medium's loss probability. Used by `swarm-agent simulate` and tests.

use crate::domain::transport::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct Datagram {
    origin: u64,
    payload: Arc<[u8]>,
}

/// Shared medium; cheap to clone.
#[derive(Clone)]
pub struct MemoryMedium {
    sender: broadcast::Sender<Datagram>,
    loss_rate: f64,
    next_endpoint: Arc<AtomicU64>,
}

impl MemoryMedium {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            loss_rate: 0.0,
            next_endpoint: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Probability in `[0, 1]` that a receiver misses a datagram.
    pub fn with_loss_rate(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate.clamp(0.0, 1.0);
        self
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    /// Attach a new endpoint. It only hears datagrams sent after this call.
    pub fn endpoint(&self) -> MemoryTransport {
        MemoryTransport {
            id: self.next_endpoint.fetch_add(1, Ordering::Relaxed),
            sender: self.sender.clone(),
            receiver: Mutex::new(self.sender.subscribe()),
            loss_rate: self.loss_rate,
        }
    }
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new(1024)
    }
}

pub struct MemoryTransport {
    id: u64,
    sender: broadcast::Sender<Datagram>,
    receiver: Mutex<broadcast::Receiver<Datagram>>,
    loss_rate: f64,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn broadcast(&self, payload: &[u8]) -> Result<(), TransportError> {
        // No listeners is not an error on a broadcast medium
        let _ = self.sender.send(Datagram {
            origin: self.id,
            payload: Arc::from(payload),
        });
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut receiver = self.receiver.lock().await;
        loop {
            match receiver.recv().await {
                Ok(datagram) => {
                    if datagram.origin == self.id {
                        continue;
                    }
                    if self.loss_rate > 0.0 && rand::random::<f64>() < self.loss_rate {
                        trace!(endpoint = self.id, "Datagram lost");
                        continue;
                    }
                    return Ok(datagram.payload.to_vec());
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(endpoint = self.id, "Endpoint lagged, {} datagrams lost", n);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }
}
