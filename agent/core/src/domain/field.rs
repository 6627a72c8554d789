// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Sensing and actuation port.
//!
//! The physical robot (or a simulated field) samples the binary property at
//! its current location and performs the action on the current cell.

pub trait FieldInterface: Send + Sync {
    /// Observe the property at the current location.
    fn sample_observation(&self) -> bool;

    /// Perform one physical action cycle on the current location.
    fn perform_action(&self);
}
