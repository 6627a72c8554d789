// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Simulated environment for agents without hardware.
//!
//! The field is a grid of `world_cells` cells of which a `prevalence` share
//! hold the property. Each sample lands on a random cell; each action cycle
//! clears the visited cell if it held the property. One field may be shared by
//! a whole simulated swarm.

use crate::domain::field::FieldInterface;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

pub struct SimulatedField {
    prevalence: Mutex<f64>,
    cell_share: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedField {
    pub fn new(prevalence: f64, world_cells: usize) -> Self {
        Self {
            prevalence: Mutex::new(prevalence.clamp(0.0, 1.0)),
            cell_share: 1.0 / world_cells.max(1) as f64,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Share of cells still holding the property.
    pub fn prevalence(&self) -> f64 {
        *self.prevalence.lock()
    }
}

impl FieldInterface for SimulatedField {
    fn sample_observation(&self) -> bool {
        let prevalence = self.prevalence();
        self.rng.lock().random::<f64>() < prevalence
    }

    fn perform_action(&self) {
        let mut prevalence = self.prevalence.lock();
        if self.rng.lock().random::<f64>() < *prevalence {
            let remaining = *prevalence - self.cell_share;
            // Snap rounding residue to an empty field
            *prevalence = if remaining < self.cell_share / 2.0 { 0.0 } else { remaining };
            trace!(prevalence = *prevalence, "Cell cleared");
        }
    }
}
