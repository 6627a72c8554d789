// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `swarm-agent monitor` - the receiving end of the supervisor channel

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use swarm_core::infrastructure::supervisor_monitor::SupervisorMonitor;

#[derive(Args)]
pub struct MonitorArgs {
    /// Address to accept agent connections on
    #[arg(long, env = "SWARM_MONITOR_LISTEN", default_value = "0.0.0.0:47001")]
    listen: String,
}

pub async fn execute(args: MonitorArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to listen on {}", args.listen))?;

    let monitor = Arc::new(SupervisorMonitor::new());
    let token = CancellationToken::new();
    let server = tokio::spawn(monitor.clone().serve(listener, token.clone()));

    crate::shutdown_signal().await;
    token.cancel();
    server
        .await
        .context("Monitor task panicked")?
        .context("Monitor stopped with an error")?;

    println!();
    println!("{}", "Final action states:".bold());
    for (agent_id, acting) in monitor.snapshot() {
        if acting {
            println!("  {} {}", agent_id, "acting".green());
        } else {
            println!("  {} {}", agent_id, "idle".yellow());
        }
    }
    println!(
        "{} of {} agents acting",
        monitor.acting_count(),
        monitor.known_agents()
    );

    Ok(())
}
