//! YAML seed files for `leadflow import`.
//!
//! ```yaml
//! name: Sales board
//! pipelines:
//!   - id: sales
//!     name: Sales
//!     stages:            # optional, defaults to new/qualified/proposal/won
//!       - id: new
//!         name: New
//!     leads:
//!       - id: acme       # optional, a ULID is generated otherwise
//!         name: Acme Corp
//!         stage: new
//!         value: 12000
//!         tags: [enterprise]
//! ```
//!
//! Stage order follows list order. Lead order within a stage follows list
//! order unless an explicit `order` is given.

use anyhow::{Context, Result};
use leadflow_board::types::{Lead, LeadId, Pipeline, PipelineId, Stage, StageId};
use leadflow_board::{BoardMeta, BoardModel};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Seed {
    pub name: String,
    #[serde(default)]
    pub pipelines: Vec<PipelineSeed>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<StageSeed>,
    #[serde(default)]
    pub leads: Vec<LeadSeed>,
}

#[derive(Debug, Deserialize)]
pub struct StageSeed {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LeadSeed {
    pub id: Option<String>,
    pub name: String,
    pub stage: String,
    pub order: Option<usize>,
    pub value: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Seed {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid seed file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Build a normalized board, rejecting leads placed in another
    /// pipeline's stage.
    pub fn into_board(self) -> Result<(BoardMeta, BoardModel)> {
        let mut pipelines = Vec::new();
        let mut stages = Vec::new();
        let mut leads = Vec::new();

        for pipeline in self.pipelines {
            let pipeline_id = PipelineId::from_string(pipeline.id);

            let pipeline_stages = if pipeline.stages.is_empty() {
                Stage::default_stages(&pipeline_id)
            } else {
                pipeline
                    .stages
                    .into_iter()
                    .enumerate()
                    .map(|(order, s)| Stage::new(s.id, pipeline_id.clone(), s.name, order))
                    .collect()
            };

            let mut next_order: HashMap<StageId, usize> = HashMap::new();
            for seed in pipeline.leads {
                let stage_id = StageId::from_string(seed.stage);
                if !pipeline_stages.iter().any(|s| s.id == stage_id) {
                    anyhow::bail!(
                        "lead '{}' references stage '{}' outside pipeline '{}'",
                        seed.name,
                        stage_id,
                        pipeline_id
                    );
                }

                let slot = next_order.entry(stage_id.clone()).or_default();
                let order = seed.order.unwrap_or(*slot);
                *slot += 1;

                let mut lead = Lead::new(seed.name, stage_id, order)
                    .with_id(seed.id.map(LeadId::from_string).unwrap_or_else(LeadId::new))
                    .with_tags(seed.tags);
                if let Some(value) = seed.value {
                    lead = lead.with_value(value);
                }
                leads.push(lead);
            }

            pipelines.push(Pipeline::new(pipeline_id, pipeline.name));
            stages.extend(pipeline_stages);
        }

        let board = BoardModel::from_parts(pipelines, stages, leads)?;
        Ok((BoardMeta { name: self.name }, board))
    }
}
