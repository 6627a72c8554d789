// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::action_state::{BroadcastMode, TransitionCause};
use crate::domain::agent::{AgentId, Tick};

/// Events emitted by an agent's consensus engine.
///
/// Published in-process on the event bus; the supervisor receives only the
/// start/stop subset through its own channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ActionStarted {
        agent_id: AgentId,
        d: f64,
        cause: TransitionCause,
        tick: Tick,
        started_at: DateTime<Utc>,
    },
    ActionStopped {
        agent_id: AgentId,
        cause: TransitionCause,
        tick: Tick,
        stopped_at: DateTime<Utc>,
    },
    BroadcastModeChanged {
        agent_id: AgentId,
        mode: BroadcastMode,
        tick: Tick,
        changed_at: DateTime<Utc>,
    },
    TickCompleted {
        agent_id: AgentId,
        tick: Tick,
        local_belief: f64,
        swarm_belief: f64,
        acting: bool,
        mode: BroadcastMode,
    },
}

impl AgentEvent {
    pub fn agent_id(&self) -> AgentId {
        match self {
            Self::ActionStarted { agent_id, .. }
            | Self::ActionStopped { agent_id, .. }
            | Self::BroadcastModeChanged { agent_id, .. }
            | Self::TickCompleted { agent_id, .. } => *agent_id,
        }
    }
}
