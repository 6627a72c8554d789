// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Local observation memory.
//!
//! A fixed-capacity ring of binary observations. Written by the sensing side,
//! read by the tick loop to derive this agent's own belief.

use parking_lot::Mutex;

#[derive(Debug)]
struct Ring {
    slots: Vec<bool>,
    /// Index of the most recent write, `None` until the first observation.
    last_write: Option<usize>,
    /// Set once the ring has been filled; never cleared.
    valid: bool,
}

/// Sliding window over the most recent `capacity` observations.
#[derive(Debug)]
pub struct ObservationBuffer {
    ring: Mutex<Ring>,
}

impl ObservationBuffer {
    /// Panics if `capacity` is zero; configuration validation rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "observation buffer capacity must be positive");
        Self {
            ring: Mutex::new(Ring {
                slots: vec![false; capacity],
                last_write: None,
                valid: false,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().slots.len()
    }

    /// Overwrite the oldest slot with `observation`.
    pub fn record(&self, observation: bool) {
        let mut ring = self.ring.lock();
        let capacity = ring.slots.len();
        let next = ring.last_write.map_or(0, |i| (i + 1) % capacity);
        ring.slots[next] = observation;
        ring.last_write = Some(next);
        if next == capacity - 1 {
            ring.valid = true;
        }
    }

    /// True once at least `capacity` observations have been recorded.
    pub fn is_valid(&self) -> bool {
        self.ring.lock().valid
    }

    /// Fraction of `true` observations, or `placeholder` while the buffer is
    /// not yet valid.
    pub fn belief(&self, placeholder: f64) -> f64 {
        let ring = self.ring.lock();
        if !ring.valid {
            return placeholder;
        }
        let positives = ring.slots.iter().filter(|o| **o).count();
        positives as f64 / ring.slots.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_until_filled() {
        let buffer = ObservationBuffer::new(3);
        assert!(!buffer.is_valid());
        assert_eq!(buffer.belief(0.65), 0.65);

        buffer.record(true);
        buffer.record(true);
        assert!(!buffer.is_valid());
        assert_eq!(buffer.belief(0.65), 0.65);

        buffer.record(false);
        assert!(buffer.is_valid());
        assert!((buffer.belief(0.65) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_slides_over_oldest() {
        let buffer = ObservationBuffer::new(4);
        for _ in 0..4 {
            buffer.record(true);
        }
        assert_eq!(buffer.belief(0.5), 1.0);

        buffer.record(false);
        buffer.record(false);
        assert_eq!(buffer.belief(0.5), 0.5);

        for _ in 0..4 {
            buffer.record(false);
        }
        assert_eq!(buffer.belief(0.5), 0.0);
    }

    #[test]
    fn test_validity_is_permanent() {
        let buffer = ObservationBuffer::new(2);
        buffer.record(true);
        buffer.record(true);
        for _ in 0..7 {
            buffer.record(false);
        }
        assert!(buffer.is_valid());
    }

    #[test]
    fn test_capacity_one() {
        let buffer = ObservationBuffer::new(1);
        buffer.record(true);
        assert!(buffer.is_valid());
        assert_eq!(buffer.belief(0.0), 1.0);
        buffer.record(false);
        assert_eq!(buffer.belief(1.0), 0.0);
    }
}
