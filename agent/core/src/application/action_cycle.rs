// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Action-cycle driver
//!
//! Runs the agent's movement: a forward leg takes `samples_per_cycle`
//! observations one sample interval apart, and at the end of each leg an
//! acting agent performs the action on its cell and decides whether to keep
//! going. Runs while the movement flag is up.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::agent::SwarmAgent;
use crate::domain::action_state::ContinuationOutcome;
use crate::domain::field::FieldInterface;

pub struct ActionCycleDriver {
    agent: Arc<SwarmAgent>,
    field: Arc<dyn FieldInterface>,
    sample_interval: Duration,
    samples_per_cycle: u32,
    movement: CancellationToken,
}

impl ActionCycleDriver {
    pub fn new(
        agent: Arc<SwarmAgent>,
        field: Arc<dyn FieldInterface>,
        sample_interval: Duration,
        samples_per_cycle: u32,
        movement: CancellationToken,
    ) -> Self {
        Self {
            agent,
            field,
            sample_interval,
            samples_per_cycle: samples_per_cycle.max(1),
            movement,
        }
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            agent_id = %self.agent.id(),
            sample_interval_ms = self.sample_interval.as_millis() as u64,
            samples_per_cycle = self.samples_per_cycle,
            "Starting action-cycle driver"
        );

        let mut ticker = interval(self.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut samples = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.movement.cancelled() => break,
                _ = ticker.tick() => {
                    self.sample();
                    samples += 1;
                    if samples >= self.samples_per_cycle {
                        samples = 0;
                        self.end_of_leg();
                    }
                }
            }
        }

        info!(agent_id = %self.agent.id(), "Action-cycle driver stopped");
    }

    /// Observe the current cell and remember the result.
    pub fn sample(&self) -> bool {
        let observation = self.field.sample_observation();
        self.agent.record_observation(observation);
        observation
    }

    /// Act on the cell if acting, then run the continuation decision.
    pub fn end_of_leg(&self) -> Option<ContinuationOutcome> {
        if !self.agent.is_acting() {
            return None;
        }
        self.field.perform_action();
        let outcome = self.agent.action_cycle();
        debug!(agent_id = %self.agent.id(), ?outcome, "Action cycle completed");
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_state::ForcedState;
    use crate::domain::agent::AgentId;
    use crate::domain::node_config::SwarmParameters;
    use crate::domain::notification::NoopNotifier;
    use crate::infrastructure::event_bus::EventBus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingField {
        samples: AtomicUsize,
        actions: AtomicUsize,
    }

    impl FieldInterface for CountingField {
        fn sample_observation(&self) -> bool {
            self.samples.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn perform_action(&self) {
            self.actions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn agent() -> Arc<SwarmAgent> {
        Arc::new(SwarmAgent::new(
            AgentId(1),
            SwarmParameters::default(),
            Arc::new(NoopNotifier),
            EventBus::new(16),
        ))
    }

    #[test]
    fn test_idle_agent_does_not_act() {
        let field = Arc::new(CountingField::default());
        let driver = ActionCycleDriver::new(agent(), field.clone(), Duration::from_secs(1), 3, CancellationToken::new());
        assert_eq!(driver.end_of_leg(), None);
        assert_eq!(field.actions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_acting_agent_acts_and_decides() {
        let agent = agent();
        agent.queue_forced_state(ForcedState::Start { d: 0.95 });
        agent.advance_tick();

        let field = Arc::new(CountingField::default());
        let driver = ActionCycleDriver::new(agent.clone(), field.clone(), Duration::from_secs(1), 3, CancellationToken::new());
        assert!(matches!(driver.end_of_leg(), Some(ContinuationOutcome::KeptDeterministic { .. })));
        assert_eq!(field.actions.load(Ordering::SeqCst), 1);
        assert!(agent.action_state().d < 0.95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_fill_memory_at_fixed_interval() {
        let agent = agent();
        let field = Arc::new(CountingField::default());
        let movement = CancellationToken::new();
        let handle = ActionCycleDriver::new(agent.clone(), field.clone(), Duration::from_secs(1), 3, movement.clone()).start();

        // Immediate first sample, then one per second
        tokio::time::sleep(Duration::from_millis(9500)).await;
        movement.cancel();
        handle.await.unwrap();

        assert_eq!(field.samples.load(Ordering::SeqCst), 10);
        assert!(agent.observations().is_valid());
        assert_eq!(agent.local_belief(), 1.0);
    }
}
