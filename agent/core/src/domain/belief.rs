// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Belief Store
//!
//! Holds, per known source, the most recent `(timestamp, belief)` pair heard
//! from that agent (including this agent's own entry) and aggregates them into
//! the swarm belief.
//!
//! ## Conflict Resolution
//!
//! | Incoming | Stored | Result |
//! |----------|--------|--------|
//! | value ∉ [0,1] | any | rejected, never stored |
//! | any | absent | inserted |
//! | `t > stored.t` | present | replaced |
//! | `t <= stored.t` | present | ignored (stale) |
//!
//! Duplicate and reordered deliveries are therefore idempotent.
//!
//! All locking is internal; callers only see [`BeliefStore::upsert`] and the
//! snapshot readers.

use crate::domain::agent::{AgentId, Tick};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A belief datum as stored for one source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefEntry {
    pub timestamp: Tick,
    pub value: f64,
}

impl BeliefEntry {
    pub fn new(timestamp: Tick, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// What [`BeliefStore::upsert`] did with a datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Timestamp not newer than the stored entry.
    Stale,
    /// Value outside [0,1] or not finite.
    OutOfRange,
}

impl UpsertOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced)
    }
}

/// Returns true when `value` is a storable belief degree.
pub fn is_valid_belief(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Concurrent last-writer-wins table of beliefs keyed by source.
#[derive(Debug, Default)]
pub struct BeliefStore {
    entries: RwLock<HashMap<AgentId, BeliefEntry>>,
}

impl BeliefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a belief for `source` if it is in range and newer than what is stored.
    pub fn upsert(&self, source: AgentId, timestamp: Tick, value: f64) -> UpsertOutcome {
        if !is_valid_belief(value) {
            return UpsertOutcome::OutOfRange;
        }

        let mut entries = self.entries.write();
        match entries.get(&source) {
            None => {
                entries.insert(source, BeliefEntry::new(timestamp, value));
                UpsertOutcome::Inserted
            }
            Some(stored) if stored.timestamp < timestamp => {
                entries.insert(source, BeliefEntry::new(timestamp, value));
                UpsertOutcome::Replaced
            }
            Some(_) => UpsertOutcome::Stale,
        }
    }

    pub fn get(&self, source: AgentId) -> Option<BeliefEntry> {
        self.entries.read().get(&source).copied()
    }

    /// Number of sources heard from so far (own entry included once published).
    pub fn known_sources(&self) -> usize {
        self.entries.read().len()
    }

    /// Consistent copy of the whole table, ordered by source id.
    pub fn snapshot(&self) -> Vec<(AgentId, BeliefEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(id, entry)| (*id, *entry))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Imputed average of all known beliefs.
    ///
    /// Every agent not yet heard from contributes `neutral_value`, so the
    /// aggregate is defined even when the table is empty. `swarm_size` must be
    /// positive (enforced by configuration validation).
    pub fn swarm_belief(&self, swarm_size: usize, neutral_value: f64) -> f64 {
        let (sum, known) = {
            let entries = self.entries.read();
            let sum: f64 = entries.values().map(|entry| entry.value).sum();
            (sum, entries.len())
        };

        if known == 0 {
            return neutral_value;
        }

        let unknown = swarm_size as f64 - known as f64;
        (sum + neutral_value * unknown) / swarm_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_upsert_inserts() {
        let store = BeliefStore::new();
        assert_eq!(store.upsert(AgentId(1), 3, 0.4), UpsertOutcome::Inserted);
        assert_eq!(store.get(AgentId(1)), Some(BeliefEntry::new(3, 0.4)));
    }

    #[test]
    fn test_newer_timestamp_replaces() {
        let store = BeliefStore::new();
        store.upsert(AgentId(1), 3, 0.4);
        assert_eq!(store.upsert(AgentId(1), 4, 0.9), UpsertOutcome::Replaced);
        assert_eq!(store.get(AgentId(1)), Some(BeliefEntry::new(4, 0.9)));
    }

    #[test]
    fn test_equal_or_older_timestamp_is_ignored() {
        let store = BeliefStore::new();
        store.upsert(AgentId(1), 10, 0.4);
        assert_eq!(store.upsert(AgentId(1), 10, 0.9), UpsertOutcome::Stale);
        assert_eq!(store.upsert(AgentId(1), 2, 0.9), UpsertOutcome::Stale);
        assert_eq!(store.get(AgentId(1)), Some(BeliefEntry::new(10, 0.4)));
    }

    #[test]
    fn test_out_of_range_never_stored() {
        let store = BeliefStore::new();
        assert_eq!(store.upsert(AgentId(1), 1, 1.01), UpsertOutcome::OutOfRange);
        assert_eq!(store.upsert(AgentId(1), 1, -0.01), UpsertOutcome::OutOfRange);
        assert_eq!(store.upsert(AgentId(1), 1, f64::NAN), UpsertOutcome::OutOfRange);
        assert_eq!(store.known_sources(), 0);

        store.upsert(AgentId(1), 1, 0.5);
        assert_eq!(store.upsert(AgentId(1), 99, 2.0), UpsertOutcome::OutOfRange);
        assert_eq!(store.get(AgentId(1)), Some(BeliefEntry::new(1, 0.5)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let store = BeliefStore::new();
        assert!(store.upsert(AgentId(1), 1, 0.0).accepted());
        assert!(store.upsert(AgentId(2), 1, 1.0).accepted());
    }

    #[test]
    fn test_swarm_belief_empty_is_neutral() {
        let store = BeliefStore::new();
        for size in [1, 2, 3, 5, 7, 100] {
            assert_eq!(store.swarm_belief(size, 0.65), 0.65);
        }
    }

    #[test]
    fn test_swarm_belief_all_ones() {
        let store = BeliefStore::new();
        for id in 0..5 {
            store.upsert(AgentId(id), 1, 1.0);
        }
        assert_eq!(store.swarm_belief(5, 0.65), 1.0);
    }

    #[test]
    fn test_swarm_belief_imputes_unknown_sources() {
        let store = BeliefStore::new();
        store.upsert(AgentId(1), 1, 1.0);
        store.upsert(AgentId(2), 1, 0.0);
        // (1.0 + 0.0 + 3 * 0.5) / 5
        let belief = store.swarm_belief(5, 0.5);
        assert!((belief - 0.5).abs() < 1e-12);

        store.upsert(AgentId(3), 1, 1.0);
        // (2.0 + 2 * 0.5) / 5
        let belief = store.swarm_belief(5, 0.5);
        assert!((belief - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_sorted_by_source() {
        let store = BeliefStore::new();
        store.upsert(AgentId(9), 1, 0.1);
        store.upsert(AgentId(2), 1, 0.2);
        let ids: Vec<_> = store.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![AgentId(2), AgentId(9)]);
    }

    #[test]
    fn test_concurrent_upserts_keep_latest() {
        use std::sync::Arc;

        let store = Arc::new(BeliefStore::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for t in 0..500u64 {
                        store.upsert(AgentId(1), t * 4 + worker, 0.5);
                        let _ = store.swarm_belief(5, 0.65);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get(AgentId(1)).unwrap().timestamp, 499 * 4 + 3);
    }
}
