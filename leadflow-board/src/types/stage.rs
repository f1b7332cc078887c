//! Board-level types: Pipeline, Stage

use super::ids::{PipelineId, StageId};
use serde::{Deserialize, Serialize};

/// A pipeline groups the stages of one sales process variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pipeline {
    #[serde(skip)]
    pub id: PipelineId,
    pub name: String,
}

impl Pipeline {
    pub fn new(id: impl Into<PipelineId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A stage is an ordered column within a pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stage {
    #[serde(skip)]
    pub id: StageId,
    pub pipeline_id: PipelineId,
    pub name: String,
    /// Position among sibling stages
    pub order: usize,
}

impl Stage {
    pub fn new(
        id: impl Into<StageId>,
        pipeline_id: impl Into<PipelineId>,
        name: impl Into<String>,
        order: usize,
    ) -> Self {
        Self {
            id: id.into(),
            pipeline_id: pipeline_id.into(),
            name: name.into(),
            order,
        }
    }

    /// Default stages of a new sales pipeline
    pub fn default_stages(pipeline_id: &PipelineId) -> Vec<Stage> {
        [("new", "New"), ("qualified", "Qualified"), ("proposal", "Proposal"), ("won", "Won")]
            .into_iter()
            .enumerate()
            .map(|(order, (id, name))| Stage::new(id, pipeline_id.clone(), name, order))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stages() {
        let stages = Stage::default_stages(&PipelineId::from("sales"));
        assert_eq!(stages.len(), 4);
        assert_eq!(stages[0].id, "new");
        assert_eq!(stages[3].order, 3);
        assert!(stages.iter().all(|s| s.pipeline_id == "sales"));
    }

    #[test]
    fn test_stage_serialization_skips_id() {
        let stage = Stage::new("new", "sales", "New", 0);
        let json = serde_json::to_string(&stage).unwrap();
        assert!(!json.contains("\"id\""));
        let parsed: Stage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "New");
        assert_eq!(parsed.pipeline_id, "sales");
    }
}
