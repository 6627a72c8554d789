// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Infrastructure Layer
//!
//! Adapters behind the domain ports.
//!
//! | Module | Adapter |
//! |--------|---------|
//! | [`event_bus`] | in-process `AgentEvent` pub/sub |
//! | [`udp_transport`] | `Transport` over UDP broadcast |
//! | [`memory_transport`] | `Transport` over a shared lossy channel |
//! | [`supervisor_client`] | `ActionNotifier` over TCP JSON lines |
//! | [`supervisor_monitor`] | the receiving end of the supervisor channel |
//! | [`simulated_field`] | `FieldInterface` without hardware |

pub mod event_bus;
pub mod memory_transport;
pub mod simulated_field;
pub mod supervisor_client;
pub mod supervisor_monitor;
pub mod udp_transport;
