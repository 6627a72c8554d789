// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure consensus types and ports. No I/O.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`agent`] | `AgentId`, `Tick` |
//! | [`belief`] | `BeliefStore`, `BeliefEntry`, `UpsertOutcome` |
//! | [`observation`] | `ObservationBuffer` |
//! | [`action_state`] | `ActionState`, `BroadcastMode`, `ForcedState` |
//! | [`message`] | `SwarmMessage`, `CodecError` |
//! | [`node_config`] | `AgentConfigManifest`, `SwarmParameters` |
//! | [`transport`] | `Transport` port |
//! | [`notification`] | `ActionNotifier` port |
//! | [`field`] | `FieldInterface` port |
//! | [`events`] | `AgentEvent` |

pub mod agent;
pub mod belief;
pub mod observation;
pub mod action_state;
pub mod message;
pub mod node_config;
pub mod transport;
pub mod notification;
pub mod field;
pub mod events;
