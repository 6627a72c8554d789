// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tick loop - advances the agent's logical clock once per period
//!
//! The first tick fires one period after start. Late ticks are delayed rather
//! than bunched, so the clock never catches up on lost time.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::agent::SwarmAgent;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct TickLoop {
    agent: Arc<SwarmAgent>,
    period: Duration,
    shutdown_token: CancellationToken,
}

impl TickLoop {
    pub fn new(agent: Arc<SwarmAgent>, period: Duration, shutdown_token: CancellationToken) -> Self {
        Self {
            agent,
            period,
            shutdown_token,
        }
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(agent_id = %self.agent.id(), period_ms = self.period.as_millis() as u64, "Starting tick loop");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.agent.advance_tick();
                    debug!(
                        agent_id = %self.agent.id(),
                        tick = report.tick,
                        local_belief = report.local_belief,
                        swarm_belief = report.swarm_belief,
                        "Tick"
                    );
                }
                _ = self.shutdown_token.cancelled() => {
                    break;
                }
            }
        }

        info!(agent_id = %self.agent.id(), "Tick loop stopped");
    }
}
