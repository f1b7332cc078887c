//! Lead types: Lead, LeadPosition, LeadPatch

use super::ids::{LeadId, StageId};
use serde::{Deserialize, Serialize};

/// A lead (work item) on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(skip)]
    pub id: LeadId,
    /// Owning stage. A lead belongs to exactly one stage.
    pub stage_id: StageId,
    /// Dense position within the owning stage
    pub order: usize,

    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Lead {
    /// Create a new lead in the given stage
    pub fn new(name: impl Into<String>, stage_id: impl Into<StageId>, order: usize) -> Self {
        Self {
            id: LeadId::new(),
            stage_id: stage_id.into(),
            order,
            name: name.into(),
            value: None,
            tags: Vec::new(),
        }
    }

    /// Set an explicit id (used when ids come from the backend)
    pub fn with_id(mut self, id: impl Into<LeadId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the deal value
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Current position of this lead
    pub fn position(&self) -> LeadPosition {
        LeadPosition {
            stage_id: self.stage_id.clone(),
            order: self.order,
        }
    }

    /// Apply a partial position update
    pub fn apply_patch(&mut self, patch: &LeadPatch) {
        if let Some(stage_id) = &patch.stage_id {
            self.stage_id = stage_id.clone();
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Where a lead sits: stage plus order within the stage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadPosition {
    pub stage_id: StageId,
    pub order: usize,
}

impl LeadPosition {
    pub fn new(stage_id: impl Into<StageId>, order: usize) -> Self {
        Self {
            stage_id: stage_id.into(),
            order,
        }
    }
}

/// Partial update sent to a [`crate::LeadStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<StageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
}

impl LeadPatch {
    /// Patch carrying a full position
    pub fn position(position: &LeadPosition) -> Self {
        Self {
            stage_id: Some(position.stage_id.clone()),
            order: Some(position.order),
        }
    }

    /// Check whether the patch changes anything
    pub fn is_empty(&self) -> bool {
        self.stage_id.is_none() && self.order.is_none()
    }
}
