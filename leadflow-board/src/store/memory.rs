//! In-process lead store with failure injection

use super::LeadStore;
use crate::board::BoardModel;
use crate::error::{BoardError, Result};
use crate::types::{LeadId, LeadPatch, LeadPosition};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Keeps lead positions in memory and records every update call.
///
/// Updates can be made to fail per lead or globally, and can be delayed, so
/// callers can exercise their failure and in-flight paths against a real
/// store.
#[derive(Debug, Default)]
pub struct MemoryLeadStore {
    positions: Mutex<HashMap<LeadId, LeadPosition>>,
    calls: Mutex<Vec<(LeadId, LeadPatch)>>,
    failing: Mutex<HashSet<LeadId>>,
    fail_all: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed stored positions from a board
    pub fn from_board(board: &BoardModel) -> Self {
        let positions = board.leads().map(|l| (l.id.clone(), l.position())).collect();
        Self {
            positions: Mutex::new(positions),
            ..Self::default()
        }
    }

    /// Delay every update by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make updates for one lead fail until [`MemoryLeadStore::heal`]
    pub fn fail_lead(&self, id: impl Into<LeadId>) {
        lock(&self.failing).insert(id.into());
    }

    /// Make every update fail until [`MemoryLeadStore::heal`]
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        self.fail_all.store(false, Ordering::SeqCst);
        lock(&self.failing).clear();
    }

    /// Every update call received, including failed ones, in arrival order
    pub fn calls(&self) -> Vec<(LeadId, LeadPatch)> {
        lock(&self.calls).clone()
    }

    pub fn position(&self, id: &LeadId) -> Option<LeadPosition> {
        lock(&self.positions).get(id).cloned()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn update_lead(&self, lead_id: &LeadId, patch: &LeadPatch) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        lock(&self.calls).push((lead_id.clone(), patch.clone()));

        if self.fail_all.load(Ordering::SeqCst) || lock(&self.failing).contains(lead_id) {
            return Err(BoardError::rejected(format!("update of lead {lead_id} refused")));
        }

        let mut positions = lock(&self.positions);
        match positions.get_mut(lead_id) {
            Some(position) => {
                if let Some(stage_id) = &patch.stage_id {
                    position.stage_id = stage_id.clone();
                }
                if let Some(order) = patch.order {
                    position.order = order;
                }
            }
            None => match (&patch.stage_id, patch.order) {
                (Some(stage_id), Some(order)) => {
                    positions.insert(lead_id.clone(), LeadPosition::new(stage_id.clone(), order));
                }
                _ => {
                    return Err(BoardError::LeadNotFound {
                        id: lead_id.to_string(),
                    })
                }
            },
        }
        Ok(())
    }
}

/// Lock a std mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
