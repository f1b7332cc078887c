//! Log entry types for activity tracking

use super::ids::{LeadId, LogEntryId};
use super::lead::LeadPatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A log entry recording a patch applied by a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique ID for this log entry
    pub id: LogEntryId,

    /// When the patch was applied
    pub timestamp: DateTime<Utc>,

    /// Canonical op string (e.g., "move lead")
    pub op: String,

    /// The lead that was patched
    pub lead_id: LeadId,

    /// The applied patch
    pub patch: LeadPatch,

    /// Who performed the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl LogEntry {
    /// Create a log entry for a lead move
    pub fn moved(lead_id: LeadId, patch: LeadPatch) -> Self {
        Self {
            id: LogEntryId::new(),
            timestamp: Utc::now(),
            op: "move lead".to_string(),
            lead_id,
            patch,
            actor: None,
        }
    }

    /// Set the actor
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}
