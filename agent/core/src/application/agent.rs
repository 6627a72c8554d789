// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Agent
//!
//! The shared state of one agent and the operations every concurrent caller
//! goes through:
//!
//! | Caller | Entry point |
//! |--------|-------------|
//! | tick loop | [`SwarmAgent::advance_tick`] |
//! | broadcast loop | [`SwarmAgent::broadcast_mode`], [`SwarmAgent::own_belief_message`], [`SwarmAgent::action_message`] |
//! | receive handler | [`SwarmAgent::accept_belief`], [`SwarmAgent::queue_forced_state`] |
//! | action-cycle driver | [`SwarmAgent::record_observation`], [`SwarmAgent::action_cycle`] |
//!
//! ## Locking
//!
//! `ActionState` lives behind one mutex and is only ever changed as a whole.
//! The pending forced state is a separate single-slot mailbox. Lock order is
//! state → pending → beliefs → rng; the receive handler only takes pending or
//! beliefs on their own, so no cycle exists.
//!
//! Notifications and events are emitted after the state lock is released.

use crate::domain::action_state::{
    ActionState, ActionTransition, BroadcastMode, ContinuationOutcome, ForcedState,
    TransitionCause,
};
use crate::domain::agent::{AgentId, Tick};
use crate::domain::belief::{BeliefStore, UpsertOutcome};
use crate::domain::events::AgentEvent;
use crate::domain::message::SwarmMessage;
use crate::domain::node_config::SwarmParameters;
use crate::domain::notification::{ActionNotification, ActionNotifier};
use crate::domain::observation::ObservationBuffer;
use crate::infrastructure::event_bus::EventBus;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub local_belief: f64,
    pub swarm_belief: f64,
    /// Mode `One` timed out on this tick
    pub mode_reverted: bool,
    /// Transition caused by a pending peer message
    pub forced: Option<ActionTransition>,
    /// Transition caused by the swarm belief evaluation
    pub evaluated: Option<ActionTransition>,
}

pub struct SwarmAgent {
    id: AgentId,
    params: SwarmParameters,
    beliefs: BeliefStore,
    observations: ObservationBuffer,
    state: Mutex<ActionState>,
    pending: Mutex<Option<ForcedState>>,
    tick: AtomicU64,
    notifier: Arc<dyn ActionNotifier>,
    notifier_failing: AtomicBool,
    event_bus: EventBus,
    rng: Mutex<StdRng>,
}

impl SwarmAgent {
    pub fn new(
        id: AgentId,
        params: SwarmParameters,
        notifier: Arc<dyn ActionNotifier>,
        event_bus: EventBus,
    ) -> Self {
        let observations = ObservationBuffer::new(params.memory_size);
        Self {
            id,
            params,
            beliefs: BeliefStore::new(),
            observations,
            state: Mutex::new(ActionState::new()),
            pending: Mutex::new(None),
            tick: AtomicU64::new(0),
            notifier,
            notifier_failing: AtomicBool::new(false),
            event_bus,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the random source of the continuation decision.
    pub fn with_rng(self, rng: StdRng) -> Self {
        *self.rng.lock() = rng;
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn params(&self) -> &SwarmParameters {
        &self.params
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    pub fn observations(&self) -> &ObservationBuffer {
        &self.observations
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }

    /// Consistent copy of the action state.
    pub fn action_state(&self) -> ActionState {
        *self.state.lock()
    }

    pub fn broadcast_mode(&self) -> BroadcastMode {
        self.state.lock().mode
    }

    pub fn is_acting(&self) -> bool {
        self.state.lock().acting
    }

    pub fn pending_forced_state(&self) -> Option<ForcedState> {
        *self.pending.lock()
    }

    /// Own belief from the observation memory, or the neutral placeholder.
    pub fn local_belief(&self) -> f64 {
        self.observations.belief(self.params.neutral_belief)
    }

    pub fn swarm_belief(&self) -> f64 {
        self.beliefs
            .swarm_belief(self.params.swarm_size, self.params.neutral_belief)
    }

    pub fn record_observation(&self, observation: bool) {
        self.observations.record(observation);
    }

    /// Store a belief heard from a peer (or relayed on its behalf).
    pub fn accept_belief(&self, source: AgentId, timestamp: Tick, value: f64) -> UpsertOutcome {
        let outcome = self.beliefs.upsert(source, timestamp, value);
        let label = match outcome {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Replaced => "replaced",
            UpsertOutcome::Stale => "stale",
            UpsertOutcome::OutOfRange => "out_of_range",
        };
        metrics::counter!("swarm_beliefs_received_total", "outcome" => label).increment(1);
        if outcome == UpsertOutcome::OutOfRange {
            debug!(agent_id = %self.id, source = %source, value, "Discarded out-of-range belief");
        }
        outcome
    }

    /// Leave a peer's action state in the mailbox for the next tick.
    ///
    /// Returns the unconsumed value it replaced, if any.
    pub fn queue_forced_state(&self, forced: ForcedState) -> Option<ForcedState> {
        let replaced = self.pending.lock().replace(forced);
        debug!(agent_id = %self.id, ?forced, ?replaced, "Queued action state from peer");
        replaced
    }

    /// Our own belief datum as it should go on the wire, once one exists.
    pub fn own_belief_message(&self) -> Option<SwarmMessage> {
        self.beliefs
            .get(self.id)
            .map(|entry| SwarmMessage::belief(self.id, entry.timestamp, entry.value))
    }

    /// Action datum reflecting the current state.
    pub fn action_message(&self) -> SwarmMessage {
        let state = self.action_state();
        SwarmMessage::action(state.acting, state.d)
    }

    /// One step of the controller: advance the clock, republish our belief,
    /// expire the mode timer, apply a pending peer state, evaluate the swarm.
    pub fn advance_tick(&self) -> TickReport {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst) + 1;

        let local_belief = self.local_belief();
        self.beliefs.upsert(self.id, tick, local_belief);

        let mut mode_reverted = false;
        let mut forced = None;
        let mut evaluated = None;
        let snapshot = {
            let mut state = self.state.lock();

            if state.expire_mode(tick, self.params.action_broadcast_duration) {
                mode_reverted = true;
            }

            if state.mode == BroadcastMode::Zero {
                if let Some(pending) = self.pending.lock().take() {
                    forced = state.apply_forced(pending, tick);
                }
            }

            if state.mode == BroadcastMode::Zero {
                evaluated = state.evaluate_swarm_belief(self.swarm_belief(), &self.params, tick);
            }

            *state
        };

        let swarm_belief = self.swarm_belief();
        metrics::gauge!("swarm_belief", "agent" => self.id.to_string()).set(swarm_belief);
        metrics::gauge!("swarm_local_belief", "agent" => self.id.to_string()).set(local_belief);

        if mode_reverted {
            debug!(agent_id = %self.id, tick, "Action broadcast window elapsed, back to mode ZERO");
            self.publish_mode(BroadcastMode::Zero, tick);
        }
        if let Some(transition) = forced {
            self.announce(transition, TransitionCause::PeerMessage, tick);
            self.publish_mode(BroadcastMode::One, tick);
        }
        if let Some(transition) = evaluated {
            self.announce(transition, TransitionCause::SwarmBelief, tick);
            self.publish_mode(BroadcastMode::One, tick);
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            for (source, entry) in self.beliefs.snapshot() {
                debug!(agent_id = %self.id, tick, source = %source, belief = entry.value, at = entry.timestamp, "Belief table");
            }
        }

        self.event_bus.publish(AgentEvent::TickCompleted {
            agent_id: self.id,
            tick,
            local_belief,
            swarm_belief,
            acting: snapshot.acting,
            mode: snapshot.mode,
        });

        TickReport {
            tick,
            local_belief,
            swarm_belief,
            mode_reverted,
            forced,
            evaluated,
        }
    }

    /// Continuation decision, called once per physical action cycle.
    pub fn action_cycle(&self) -> ContinuationOutcome {
        let outcome = {
            let mut state = self.state.lock();
            state.decide_continuation(&self.params, || self.rng.lock().random::<f64>())
        };

        match outcome {
            ContinuationOutcome::Idle => {}
            ContinuationOutcome::KeptDeterministic { d } => {
                debug!(agent_id = %self.id, d, "Keep acting deterministically");
            }
            ContinuationOutcome::KeptStochastic { d, probability } => {
                debug!(agent_id = %self.id, d, probability, "Keep acting stochastically");
            }
            ContinuationOutcome::StoppedBelowTarget | ContinuationOutcome::StoppedStochastic { .. } => {
                self.announce(
                    ActionTransition::Stopped,
                    TransitionCause::Continuation,
                    self.current_tick(),
                );
            }
        }

        outcome
    }

    fn publish_mode(&self, mode: BroadcastMode, tick: Tick) {
        self.event_bus.publish(AgentEvent::BroadcastModeChanged {
            agent_id: self.id,
            mode,
            tick,
            changed_at: Utc::now(),
        });
    }

    /// Log, count, publish and notify one start/stop.
    fn announce(&self, transition: ActionTransition, cause: TransitionCause, tick: Tick) {
        match transition {
            ActionTransition::Started { d } => {
                info!(agent_id = %self.id, tick, d, %cause, "Action started");
                metrics::counter!("swarm_action_transitions_total", "direction" => "start").increment(1);
                self.event_bus.publish(AgentEvent::ActionStarted {
                    agent_id: self.id,
                    d,
                    cause,
                    tick,
                    started_at: Utc::now(),
                });
            }
            ActionTransition::Stopped => {
                info!(agent_id = %self.id, tick, %cause, "Action stopped");
                metrics::counter!("swarm_action_transitions_total", "direction" => "stop").increment(1);
                self.event_bus.publish(AgentEvent::ActionStopped {
                    agent_id: self.id,
                    cause,
                    tick,
                    stopped_at: Utc::now(),
                });
            }
        }

        let notification = ActionNotification::new(self.id, transition.acting());
        match self.notifier.notify(notification) {
            Ok(()) => {
                self.notifier_failing.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                if !self.notifier_failing.swap(true, Ordering::Relaxed) {
                    warn!(agent_id = %self.id, "Supervisor notification failed: {}", e);
                } else {
                    debug!(agent_id = %self.id, "Supervisor notification failed: {}", e);
                }
            }
        }
    }
}
