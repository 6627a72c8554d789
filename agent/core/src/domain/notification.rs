// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Outbound action notifications for the supervisor.
//!
//! One record per change of the `acting` flag. Delivery is fire-and-forget:
//! a notifier must never block the caller, and its failures never feed back
//! into the action state.

use crate::domain::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// `(agent, acting)` record pushed to the supervisor.
///
/// Equality only considers the agent, so a monitor can keep one record per
/// agent in a set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActionNotification {
    pub agent_id: AgentId,
    /// 1 when the agent started acting, 0 when it stopped
    pub state: u8,
}

impl ActionNotification {
    pub fn new(agent_id: AgentId, acting: bool) -> Self {
        Self {
            agent_id,
            state: u8::from(acting),
        }
    }

    pub fn acting(&self) -> bool {
        self.state != 0
    }
}

impl PartialEq for ActionNotification {
    fn eq(&self, other: &Self) -> bool {
        self.agent_id == other.agent_id
    }
}

impl Eq for ActionNotification {}

impl Hash for ActionNotification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.agent_id.hash(state);
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Supervisor not connected")]
    NotConnected,

    #[error("Notification queue full")]
    QueueFull,

    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Supervisor connection error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receiver of action notifications. Must return promptly.
pub trait ActionNotifier: Send + Sync {
    fn notify(&self, notification: ActionNotification) -> Result<(), NotificationError>;
}

/// Notifier used when no supervisor is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ActionNotifier for NoopNotifier {
    fn notify(&self, _notification: ActionNotification) -> Result<(), NotificationError> {
        Ok(())
    }
}
