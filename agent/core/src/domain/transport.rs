// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transport port: a best-effort, lossy local broadcast medium.
//!
//! Implemented in `crate::infrastructure` by the UDP broadcast transport and by
//! the in-memory medium used for simulation and tests.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Broadcast timed out after {0} ms")]
    Timeout(u64),

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,

    #[error("Invalid transport address: {0}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one payload to every reachable neighbour. No delivery guarantee.
    async fn broadcast(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Wait for the next payload from a neighbour. Never yields this node's
    /// own broadcasts.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;
}
