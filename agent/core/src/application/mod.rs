// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod tick_loop;
pub mod broadcast_loop;
pub mod receive_handler;
pub mod action_cycle;
pub mod node;

// Re-export the runtime pieces for convenience
pub use agent::{SwarmAgent, TickReport};
pub use node::{NodeSettings, SwarmNode};
pub use receive_handler::{ReceiveHandler, ReceiveOutcome};
