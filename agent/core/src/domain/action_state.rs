// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Action State Machine
//!
//! Owns whether this agent is acting, which message kind it broadcasts, the
//! broadcast-mode timer, and the continuation estimate `d`.
//!
//! ## States
//!
//! `{NotActing, Acting} × {Zero, One}`, initially `NotActing × Zero`.
//! Mode `Zero` broadcasts beliefs; mode `One` broadcasts the action state so
//! that a start/stop spreads through the swarm.
//!
//! ## Transitions
//!
//! | Rule | Guard | Effect |
//! |------|-------|--------|
//! | swarm evaluation | mode `Zero`, idle, `b > phi` | start, `d = b`, mode `One` |
//! | swarm evaluation | mode `Zero`, acting, `b < not_phi` | stop, `d = -1`, mode `One` |
//! | continuation | acting | decay `d`, or stop (mode untouched) |
//! | forced state | mode `Zero`, pending differs | start with carried `d` / stop, mode `One` |
//! | timer expiry | mode `One`, `now - started > duration` | mode `Zero` |
//!
//! Entering mode `One` always restarts the timer at the current tick.
//!
//! [`ActionState`] is a plain value: the application layer keeps one behind a
//! single lock so `acting`, `d`, and the mode always change together.

use crate::domain::agent::Tick;
use crate::domain::node_config::SwarmParameters;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `d` while not acting.
pub const INACTIVE_ESTIMATE: f64 = -1.0;

/// Which message kind the agent is currently broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Broadcasting beliefs
    Zero,
    /// Broadcasting an action state change
    One,
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "ZERO"),
            Self::One => write!(f, "ONE"),
        }
    }
}

/// Action state requested by a peer, waiting for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ForcedState {
    Start { d: f64 },
    Stop,
}

impl ForcedState {
    pub fn acting(&self) -> bool {
        matches!(self, Self::Start { .. })
    }
}

/// A change of the `acting` flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionTransition {
    Started { d: f64 },
    Stopped,
}

impl ActionTransition {
    pub fn acting(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// What triggered a transition; carried into logs and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    SwarmBelief,
    PeerMessage,
    Continuation,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwarmBelief => write!(f, "swarm belief"),
            Self::PeerMessage => write!(f, "peer message"),
            Self::Continuation => write!(f, "continuation decision"),
        }
    }
}

/// Result of one continuation decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContinuationOutcome {
    /// Not acting; nothing decided.
    Idle,
    /// `d` was already below the target.
    StoppedBelowTarget,
    /// Still above target after this cycle's expected effect.
    KeptDeterministic { d: f64 },
    /// Won the draw; `probability` gated it and also scaled the new `d`.
    KeptStochastic { d: f64, probability: f64 },
    /// Lost the draw.
    StoppedStochastic { probability: f64 },
}

impl ContinuationOutcome {
    pub fn stopped(&self) -> bool {
        matches!(self, Self::StoppedBelowTarget | Self::StoppedStochastic { .. })
    }
}

/// Snapshot-able action state of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    pub acting: bool,
    pub mode: BroadcastMode,
    /// Tick at which mode `One` was entered; `None` in mode `Zero`.
    pub mode_started_at: Option<Tick>,
    /// Continuation estimate; [`INACTIVE_ESTIMATE`] when not acting.
    pub d: f64,
    /// Expected fraction removed by the swarm in the last action cycle.
    pub c: f64,
}

impl Default for ActionState {
    fn default() -> Self {
        Self {
            acting: false,
            mode: BroadcastMode::Zero,
            mode_started_at: None,
            d: INACTIVE_ESTIMATE,
            c: 0.0,
        }
    }
}

impl ActionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter_mode_one(&mut self, now: Tick) {
        self.mode = BroadcastMode::One;
        self.mode_started_at = Some(now);
    }

    fn start(&mut self, d: f64) -> ActionTransition {
        self.acting = true;
        self.d = d;
        ActionTransition::Started { d }
    }

    fn stop(&mut self) -> ActionTransition {
        self.acting = false;
        self.d = INACTIVE_ESTIMATE;
        ActionTransition::Stopped
    }

    /// Hysteresis rule on the aggregated swarm belief. Only effective in mode `Zero`.
    pub fn evaluate_swarm_belief(
        &mut self,
        swarm_belief: f64,
        params: &SwarmParameters,
        now: Tick,
    ) -> Option<ActionTransition> {
        if self.mode != BroadcastMode::Zero {
            return None;
        }

        let transition = if !self.acting && swarm_belief > params.phi_threshold {
            self.start(swarm_belief)
        } else if self.acting && swarm_belief < params.not_phi_threshold {
            self.stop()
        } else {
            return None;
        };

        self.enter_mode_one(now);
        Some(transition)
    }

    /// Decay model applied once per physical action cycle.
    ///
    /// `draw` supplies a uniform number in `[0, 1)` and is only called when
    /// the decision is stochastic.
    pub fn decide_continuation(
        &mut self,
        params: &SwarmParameters,
        draw: impl FnOnce() -> f64,
    ) -> ContinuationOutcome {
        if !self.acting {
            return ContinuationOutcome::Idle;
        }

        let d = self.d;
        let target = params.target_threshold;
        let c = params.activation_rate * params.swarm_density * d;
        self.c = c;

        if d < target {
            self.stop();
            return ContinuationOutcome::StoppedBelowTarget;
        }

        if d - c > target {
            self.d = d - c;
            return ContinuationOutcome::KeptDeterministic { d: self.d };
        }

        let probability = (d - target) / c;
        if draw() < probability {
            // The retained estimate is scaled by the same probability that gated the draw.
            self.d = (d - c) * probability;
            ContinuationOutcome::KeptStochastic { d: self.d, probability }
        } else {
            self.stop();
            ContinuationOutcome::StoppedStochastic { probability }
        }
    }

    /// Apply an action state requested by a peer. Only effective in mode `Zero`.
    pub fn apply_forced(&mut self, forced: ForcedState, now: Tick) -> Option<ActionTransition> {
        if self.mode != BroadcastMode::Zero || forced.acting() == self.acting {
            return None;
        }

        let transition = match forced {
            ForcedState::Start { d } => self.start(d),
            ForcedState::Stop => self.stop(),
        };
        self.enter_mode_one(now);
        Some(transition)
    }

    /// True when mode `One` has lasted strictly longer than `duration` ticks.
    pub fn mode_expired(&self, now: Tick, duration: u64) -> bool {
        match (self.mode, self.mode_started_at) {
            (BroadcastMode::One, Some(started)) => now.saturating_sub(started) > duration,
            _ => false,
        }
    }

    /// Revert to mode `Zero` if the timer has expired. Returns whether it did.
    pub fn expire_mode(&mut self, now: Tick, duration: u64) -> bool {
        if !self.mode_expired(now, duration) {
            return false;
        }
        self.mode = BroadcastMode::Zero;
        self.mode_started_at = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SwarmParameters {
        SwarmParameters::default()
    }

    fn acting_state(d: f64) -> ActionState {
        ActionState {
            acting: true,
            d,
            ..ActionState::default()
        }
    }

    #[test]
    fn test_initial_state() {
        let state = ActionState::new();
        assert!(!state.acting);
        assert_eq!(state.mode, BroadcastMode::Zero);
        assert_eq!(state.mode_started_at, None);
        assert_eq!(state.d, INACTIVE_ESTIMATE);
    }

    #[test]
    fn test_evaluation_starts_above_phi() {
        let mut state = ActionState::new();
        let transition = state.evaluate_swarm_belief(0.8, &params(), 12);
        assert_eq!(transition, Some(ActionTransition::Started { d: 0.8 }));
        assert!(state.acting);
        assert_eq!(state.d, 0.8);
        assert_eq!(state.mode, BroadcastMode::One);
        assert_eq!(state.mode_started_at, Some(12));
    }

    #[test]
    fn test_evaluation_requires_strictly_above_phi() {
        let mut state = ActionState::new();
        assert_eq!(state.evaluate_swarm_belief(0.75, &params(), 1), None);
        assert!(!state.acting);
    }

    #[test]
    fn test_evaluation_stops_below_not_phi() {
        let mut state = acting_state(0.7);
        let transition = state.evaluate_swarm_belief(0.5, &params(), 3);
        assert_eq!(transition, Some(ActionTransition::Stopped));
        assert!(!state.acting);
        assert_eq!(state.d, INACTIVE_ESTIMATE);
        assert_eq!(state.mode, BroadcastMode::One);
        assert_eq!(state.mode_started_at, Some(3));
    }

    #[test]
    fn test_hysteresis_band_is_noop() {
        for belief in [0.55, 0.6, 0.65, 0.7, 0.75] {
            let mut idle = ActionState::new();
            assert_eq!(idle.evaluate_swarm_belief(belief, &params(), 1), None);
            assert_eq!(idle, ActionState::new());

            let mut acting = acting_state(0.9);
            let before = acting;
            assert_eq!(acting.evaluate_swarm_belief(belief, &params(), 1), None);
            assert_eq!(acting.evaluate_swarm_belief(belief, &params(), 2), None);
            assert_eq!(acting, before);
        }
    }

    #[test]
    fn test_evaluation_ignored_in_mode_one() {
        let mut state = ActionState::new();
        state.evaluate_swarm_belief(0.9, &params(), 1);
        assert_eq!(state.evaluate_swarm_belief(0.1, &params(), 2), None);
        assert!(state.acting);
    }

    #[test]
    fn test_continuation_deterministic_example() {
        let mut state = acting_state(0.9);
        let outcome = state.decide_continuation(&params(), || panic!("no draw expected"));
        match outcome {
            ContinuationOutcome::KeptDeterministic { d } => assert!((d - 0.855).abs() < 1e-12),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!((state.c - 0.045).abs() < 1e-12);
        assert!(state.acting);
        assert_eq!(state.mode, BroadcastMode::Zero);
    }

    #[test]
    fn test_continuation_stops_below_target() {
        let mut state = acting_state(0.6);
        let outcome = state.decide_continuation(&params(), || panic!("no draw expected"));
        assert_eq!(outcome, ContinuationOutcome::StoppedBelowTarget);
        assert!(!state.acting);
        assert_eq!(state.d, INACTIVE_ESTIMATE);
    }

    #[test]
    fn test_continuation_stochastic_keep_scales_estimate() {
        // c = 0.05 * 0.67 = 0.0335, d - c = 0.6365 < 0.65, p = 0.02 / 0.0335
        let mut state = acting_state(0.67);
        let outcome = state.decide_continuation(&params(), || 0.0);
        let c = 0.05 * 0.67;
        let probability = (0.67 - 0.65) / c;
        match outcome {
            ContinuationOutcome::KeptStochastic { d, probability: p } => {
                assert!((p - probability).abs() < 1e-12);
                assert!((d - (0.67 - c) * probability).abs() < 1e-12);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(state.acting);
    }

    #[test]
    fn test_continuation_stochastic_stop() {
        let mut state = acting_state(0.67);
        let outcome = state.decide_continuation(&params(), || 0.99);
        assert!(matches!(outcome, ContinuationOutcome::StoppedStochastic { .. }));
        assert!(outcome.stopped());
        assert!(!state.acting);
        assert_eq!(state.d, INACTIVE_ESTIMATE);
    }

    #[test]
    fn test_continuation_idle_when_not_acting() {
        let mut state = ActionState::new();
        assert_eq!(state.decide_continuation(&params(), || 0.0), ContinuationOutcome::Idle);
    }

    #[test]
    fn test_forced_start_uses_carried_estimate() {
        let mut state = ActionState::new();
        let transition = state.apply_forced(ForcedState::Start { d: 0.81 }, 5);
        assert_eq!(transition, Some(ActionTransition::Started { d: 0.81 }));
        assert_eq!(state.d, 0.81);
        assert_eq!(state.mode, BroadcastMode::One);
        assert_eq!(state.mode_started_at, Some(5));
    }

    #[test]
    fn test_forced_state_matching_current_is_noop() {
        let mut state = ActionState::new();
        assert_eq!(state.apply_forced(ForcedState::Stop, 5), None);
        assert_eq!(state.mode, BroadcastMode::Zero);

        let mut acting = acting_state(0.8);
        assert_eq!(acting.apply_forced(ForcedState::Start { d: 0.7 }, 5), None);
        assert_eq!(acting.d, 0.8);
    }

    #[test]
    fn test_forced_state_ignored_in_mode_one() {
        let mut state = ActionState::new();
        state.evaluate_swarm_belief(0.9, &params(), 1);
        assert_eq!(state.apply_forced(ForcedState::Stop, 2), None);
        assert!(state.acting);
    }

    #[test]
    fn test_mode_expiry_boundary() {
        let mut state = ActionState::new();
        state.evaluate_swarm_belief(0.9, &params(), 10);

        assert!(!state.expire_mode(25, 15));
        assert_eq!(state.mode, BroadcastMode::One);

        assert!(state.expire_mode(26, 15));
        assert_eq!(state.mode, BroadcastMode::Zero);
        assert_eq!(state.mode_started_at, None);
        assert!(state.acting);
    }

    #[test]
    fn test_reentering_mode_one_restarts_timer() {
        let mut state = ActionState::new();
        state.evaluate_swarm_belief(0.9, &params(), 10);
        state.expire_mode(26, 15);
        state.evaluate_swarm_belief(0.1, &params(), 30);
        assert_eq!(state.mode_started_at, Some(30));
        assert!(!state.expire_mode(45, 15));
        assert!(state.expire_mode(46, 15));
    }
}
