//! Transient drag session state

use crate::types::{LeadId, StageId};
use serde::{Deserialize, Serialize};

/// What the pointer is currently over
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DropTarget {
    /// Another lead card
    Lead(LeadId),
    /// A stage column (typically its empty area)
    Stage(StageId),
}

impl DropTarget {
    /// The hovered id, as passed to `on_gesture_over`
    pub fn id(&self) -> &str {
        match self {
            DropTarget::Lead(id) => id.as_str(),
            DropTarget::Stage(id) => id.as_str(),
        }
    }
}

/// Exists only while a gesture is in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub active_lead_id: LeadId,
    /// Stage the lead sat in when the gesture started
    pub source_stage_id: StageId,
    /// Last target a hover was applied for
    pub last_over: Option<DropTarget>,
}

impl DragSession {
    pub fn new(active_lead_id: LeadId, source_stage_id: StageId) -> Self {
        Self {
            active_lead_id,
            source_stage_id,
            last_over: None,
        }
    }

    /// Whether `target` was the most recently applied hover
    pub fn is_last_over(&self, target: &DropTarget) -> bool {
        self.last_over.as_ref() == Some(target)
    }
}
