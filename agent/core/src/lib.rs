// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm agent core
//!
//! Belief consensus and action coordination for one agent of a robot swarm.
//! Agents gossip their belief about a binary environmental property over a
//! lossy broadcast medium, aggregate the swarm's belief, start and stop a
//! collective action with hysteresis, and propagate the decision to peers.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** `domain` holds the consensus rules and ports, `application`
//!   the agent and its background loops, `infrastructure` the transports,
//!   supervisor channel and simulated field.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
