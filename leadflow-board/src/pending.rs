//! Per-lead confirmation tracking for optimistic commits

use crate::persistence::PersistRole;
use crate::types::{LeadId, LeadPosition};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Whether the store has caught up with a lead's local position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No unconfirmed local change
    Confirmed,
    /// A persistence call for the latest change is in flight
    Pending,
    /// Persistence failed and the local position was kept; resolved by the
    /// next full refresh
    Stale,
}

/// An optimistic change waiting for the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub generation: u64,
    pub role: PersistRole,
    pub previous: LeadPosition,
    pub committed: LeadPosition,
}

/// Only the newest generation per lead is tracked; outcomes for older
/// generations are ignored.
#[derive(Debug, Default)]
pub struct PendingMoves {
    pending: HashMap<LeadId, PendingMove>,
    stale: HashSet<LeadId>,
}

impl PendingMoves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new change, superseding any older one for the same lead
    pub fn record(&mut self, lead_id: LeadId, entry: PendingMove) {
        self.stale.remove(&lead_id);
        self.pending.insert(lead_id, entry);
    }

    /// Clear the entry if `generation` is still the newest. Returns whether it was.
    pub fn confirm(&mut self, lead_id: &LeadId, generation: u64) -> bool {
        self.take(lead_id, generation).is_some()
    }

    /// Remove and return the entry if `generation` is still the newest
    pub fn take(&mut self, lead_id: &LeadId, generation: u64) -> Option<PendingMove> {
        match self.pending.get(lead_id) {
            Some(entry) if entry.generation == generation => self.pending.remove(lead_id),
            _ => None,
        }
    }

    pub fn mark_stale(&mut self, lead_id: LeadId) {
        self.stale.insert(lead_id);
    }

    pub fn state(&self, lead_id: &LeadId) -> SyncState {
        if self.pending.contains_key(lead_id) {
            SyncState::Pending
        } else if self.stale.contains(lead_id) {
            SyncState::Stale
        } else {
            SyncState::Confirmed
        }
    }

    pub fn stale(&self) -> impl Iterator<Item = &LeadId> {
        self.stale.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Forget everything, e.g. after a full refresh from the backend
    pub fn clear(&mut self) {
        self.pending.clear();
        self.stale.clear();
    }
}
