// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the swarm-agent CLI

pub mod config;
pub mod monitor;
pub mod run;
pub mod simulate;

pub use self::config::ConfigCommand;
pub use self::monitor::MonitorArgs;
pub use self::run::RunArgs;
pub use self::simulate::SimulateArgs;
