//! BoardModel - the canonical collection of pipelines, stages and leads
//!
//! Leads are keyed by id, so a lead can only ever name one owning stage.
//! Order density is maintained by routing every mutation through the pure
//! functions in [`crate::reorder`].

use crate::error::{BoardError, Result};
use crate::reorder::{self, CrossStageMove};
use crate::types::{Lead, LeadId, LeadPosition, Pipeline, PipelineId, Stage, StageId};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// The canonical board state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardModel {
    pipelines: BTreeMap<PipelineId, Pipeline>,
    stages: BTreeMap<StageId, Stage>,
    leads: BTreeMap<LeadId, Lead>,
}

/// A broken board invariant, reported by [`BoardModel::violations`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("stage '{stage}' has non-dense orders {orders:?}")]
    NotDense { stage: StageId, orders: Vec<usize> },

    #[error("lead '{lead}' references unknown stage '{stage}'")]
    OrphanLead { lead: LeadId, stage: StageId },

    #[error("stage '{stage}' references unknown pipeline '{pipeline}'")]
    OrphanStage { stage: StageId, pipeline: PipelineId },
}

impl BoardModel {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from loose parts, rejecting dangling references and
    /// duplicate ids, then normalizing every stage to dense orders.
    pub fn from_parts(
        pipelines: impl IntoIterator<Item = Pipeline>,
        stages: impl IntoIterator<Item = Stage>,
        leads: impl IntoIterator<Item = Lead>,
    ) -> Result<Self> {
        let mut board = Self::new();

        for pipeline in pipelines {
            if board.pipelines.contains_key(&pipeline.id) {
                return Err(BoardError::duplicate_id("pipeline", pipeline.id.as_str()));
            }
            board.pipelines.insert(pipeline.id.clone(), pipeline);
        }

        for stage in stages {
            if !board.pipelines.contains_key(&stage.pipeline_id) {
                return Err(BoardError::PipelineNotFound {
                    id: stage.pipeline_id.to_string(),
                });
            }
            if board.stages.contains_key(&stage.id) {
                return Err(BoardError::duplicate_id("stage", stage.id.as_str()));
            }
            board.stages.insert(stage.id.clone(), stage);
        }

        for lead in leads {
            if !board.stages.contains_key(&lead.stage_id) {
                return Err(BoardError::StageNotFound {
                    id: lead.stage_id.to_string(),
                });
            }
            if board.leads.contains_key(&lead.id) {
                return Err(BoardError::duplicate_id("lead", lead.id.as_str()));
            }
            board.leads.insert(lead.id.clone(), lead);
        }

        board.normalize();
        Ok(board)
    }

    /// Renumber every stage densely, keeping the existing relative order
    /// (ties broken by id).
    pub fn normalize(&mut self) {
        let stage_ids: Vec<StageId> = self.stages.keys().cloned().collect();
        for stage_id in stage_ids {
            let mut leads = self.stage_leads(&stage_id);
            reorder::renumber(&mut leads);
            self.store_leads(leads);
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    pub fn pipeline(&self, id: &PipelineId) -> Option<&Pipeline> {
        self.pipelines.get(id)
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.get(id)
    }

    /// Stages of one pipeline in display order
    pub fn stages_in(&self, pipeline_id: &PipelineId) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self
            .stages
            .values()
            .filter(|s| &s.pipeline_id == pipeline_id)
            .collect();
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        stages
    }

    pub fn leads(&self) -> impl Iterator<Item = &Lead> {
        self.leads.values()
    }

    pub fn lead(&self, id: &LeadId) -> Option<&Lead> {
        self.leads.get(id)
    }

    pub fn lead_count(&self) -> usize {
        self.leads.len()
    }

    /// Snapshot of a stage's leads in display order
    pub fn stage_leads(&self, stage_id: &StageId) -> Vec<Lead> {
        let mut leads: Vec<Lead> = self
            .leads
            .values()
            .filter(|l| &l.stage_id == stage_id)
            .cloned()
            .collect();
        leads.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        leads
    }

    pub fn position_of(&self, id: &LeadId) -> Option<LeadPosition> {
        self.leads.get(id).map(Lead::position)
    }

    /// Pipeline a lead belongs to, derived from its stage
    pub fn pipeline_of(&self, id: &LeadId) -> Option<&PipelineId> {
        let lead = self.leads.get(id)?;
        self.stages.get(&lead.stage_id).map(|s| &s.pipeline_id)
    }

    /// Whether two stages belong to the same pipeline
    pub fn same_pipeline(&self, a: &StageId, b: &StageId) -> bool {
        match (self.stages.get(a), self.stages.get(b)) {
            (Some(a), Some(b)) => a.pipeline_id == b.pipeline_id,
            _ => false,
        }
    }

    /// Leads whose position in `other` differs from their position here
    pub fn changed_positions(&self, other: &BoardModel) -> Vec<(LeadId, LeadPosition, LeadPosition)> {
        self.leads
            .values()
            .filter_map(|lead| {
                let after = other.position_of(&lead.id)?;
                let before = lead.position();
                (before != after).then(|| (lead.id.clone(), before, after))
            })
            .collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Write a stage list produced by [`crate::reorder`] back into the board
    pub fn store_leads(&mut self, leads: Vec<Lead>) {
        for lead in leads {
            self.leads.insert(lead.id.clone(), lead);
        }
    }

    /// Reorder within the lead's current stage. Returns whether anything moved.
    pub fn reorder_within_stage(&mut self, active_id: &LeadId, target_id: &LeadId) -> bool {
        let Some(stage_id) = self.leads.get(active_id).map(|l| l.stage_id.clone()) else {
            return false;
        };
        let before = self.stage_leads(&stage_id);
        let after = reorder::reorder_within_stage(before.clone(), active_id, target_id);
        if after == before {
            return false;
        }
        self.store_leads(after);
        true
    }

    /// Move a lead into another stage at `insertion_index`. Returns whether
    /// anything moved.
    pub fn move_across_stages(
        &mut self,
        active_id: &LeadId,
        target_stage_id: &StageId,
        insertion_index: usize,
    ) -> bool {
        let Some(source_stage_id) = self.leads.get(active_id).map(|l| l.stage_id.clone()) else {
            return false;
        };
        if &source_stage_id == target_stage_id || !self.stages.contains_key(target_stage_id) {
            return false;
        }

        let CrossStageMove { source, target } = reorder::move_across_stages(
            self.stage_leads(&source_stage_id),
            self.stage_leads(target_stage_id),
            active_id,
            target_stage_id,
            insertion_index,
        );
        self.store_leads(source);
        self.store_leads(target);
        true
    }

    /// Place a lead at an explicit position, renumbering the affected stages.
    ///
    /// The order is clamped to the target stage's length.
    pub fn move_lead(&mut self, id: &LeadId, to: &LeadPosition) -> Result<()> {
        let current = self
            .position_of(id)
            .ok_or_else(|| BoardError::LeadNotFound { id: id.to_string() })?;
        if !self.stages.contains_key(&to.stage_id) {
            return Err(BoardError::StageNotFound {
                id: to.stage_id.to_string(),
            });
        }
        if !self.same_pipeline(&current.stage_id, &to.stage_id) {
            return Err(BoardError::CrossPipelineMove {
                lead: id.to_string(),
                from: current.stage_id.to_string(),
                to: to.stage_id.to_string(),
            });
        }

        if current.stage_id == to.stage_id {
            let mut leads = self.stage_leads(&current.stage_id);
            if let Some(from) = reorder::index_of(&leads, id) {
                let moved = leads.remove(from);
                let at = to.order.min(leads.len());
                leads.insert(at, moved);
                reorder::renumber(&mut leads);
                self.store_leads(leads);
            }
        } else {
            self.move_across_stages(id, &to.stage_id, to.order);
        }
        Ok(())
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Every broken invariant on the board. Empty means healthy.
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for stage in self.stages.values() {
            if !self.pipelines.contains_key(&stage.pipeline_id) {
                violations.push(Violation::OrphanStage {
                    stage: stage.id.clone(),
                    pipeline: stage.pipeline_id.clone(),
                });
            }
            let leads = self.stage_leads(&stage.id);
            if !reorder::is_dense(&leads) {
                violations.push(Violation::NotDense {
                    stage: stage.id.clone(),
                    orders: leads.iter().map(|l| l.order).collect(),
                });
            }
        }

        let known: HashSet<&StageId> = self.stages.keys().collect();
        for lead in self.leads.values() {
            if !known.contains(&lead.stage_id) {
                violations.push(Violation::OrphanLead {
                    lead: lead.id.clone(),
                    stage: lead.stage_id.clone(),
                });
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BoardModel {
        BoardModel::from_parts(
            [Pipeline::new("sales", "Sales"), Pipeline::new("hiring", "Hiring")],
            [
                Stage::new("a", "sales", "A", 0),
                Stage::new("b", "sales", "B", 1),
                Stage::new("h", "hiring", "H", 0),
            ],
            [
                Lead::new("L1", "a", 0).with_id("l1"),
                Lead::new("L2", "a", 1).with_id("l2"),
                Lead::new("L3", "b", 0).with_id("l3"),
                Lead::new("H1", "h", 0).with_id("h1"),
            ],
        )
        .unwrap()
    }

    fn ids(leads: &[Lead]) -> Vec<String> {
        leads.iter().map(|l| l.id.to_string()).collect()
    }

    #[test]
    fn test_from_parts_normalizes_gaps() {
        let board = BoardModel::from_parts(
            [Pipeline::new("sales", "Sales")],
            [Stage::new("a", "sales", "A", 0)],
            [
                Lead::new("x", "a", 7).with_id("x"),
                Lead::new("y", "a", 2).with_id("y"),
                Lead::new("z", "a", 2).with_id("w"),
            ],
        )
        .unwrap();

        let leads = board.stage_leads(&"a".into());
        assert_eq!(ids(&leads), vec!["w", "y", "x"]);
        assert!(reorder::is_dense(&leads));
    }

    #[test]
    fn test_from_parts_rejects_unknown_stage() {
        let result = BoardModel::from_parts(
            [Pipeline::new("sales", "Sales")],
            [],
            [Lead::new("x", "nowhere", 0)],
        );
        assert!(matches!(result, Err(BoardError::StageNotFound { .. })));
    }

    #[test]
    fn test_from_parts_rejects_duplicate_lead() {
        let result = BoardModel::from_parts(
            [Pipeline::new("sales", "Sales")],
            [Stage::new("a", "sales", "A", 0)],
            [
                Lead::new("x", "a", 0).with_id("dup"),
                Lead::new("y", "a", 1).with_id("dup"),
            ],
        );
        assert!(matches!(result, Err(BoardError::DuplicateId { .. })));
    }

    #[test]
    fn test_pipeline_of_is_derived() {
        let board = sample();
        assert_eq!(board.pipeline_of(&"l3".into()).unwrap(), "sales");
        assert_eq!(board.pipeline_of(&"h1".into()).unwrap(), "hiring");
        assert!(board.same_pipeline(&"a".into(), &"b".into()));
        assert!(!board.same_pipeline(&"a".into(), &"h".into()));
    }

    #[test]
    fn test_stages_in_display_order() {
        let board = sample();
        let stages = board.stages_in(&"sales".into());
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].id, "a");
        assert_eq!(stages[1].id, "b");
    }

    #[test]
    fn test_move_lead_across_and_back() {
        let mut board = sample();
        board
            .move_lead(&"l1".into(), &LeadPosition::new("b", 5))
            .unwrap();
        assert_eq!(ids(&board.stage_leads(&"a".into())), vec!["l2"]);
        assert_eq!(ids(&board.stage_leads(&"b".into())), vec!["l3", "l1"]);

        board
            .move_lead(&"l1".into(), &LeadPosition::new("a", 0))
            .unwrap();
        assert_eq!(ids(&board.stage_leads(&"a".into())), vec!["l1", "l2"]);
        assert!(board.violations().is_empty());
    }

    #[test]
    fn test_move_lead_within_stage() {
        let mut board = sample();
        board
            .move_lead(&"l1".into(), &LeadPosition::new("a", 1))
            .unwrap();
        assert_eq!(ids(&board.stage_leads(&"a".into())), vec!["l2", "l1"]);
    }

    #[test]
    fn test_move_lead_rejects_other_pipeline() {
        let mut board = sample();
        let result = board.move_lead(&"l1".into(), &LeadPosition::new("h", 0));
        assert!(matches!(result, Err(BoardError::CrossPipelineMove { .. })));
    }

    #[test]
    fn test_changed_positions() {
        let before = sample();
        let mut after = before.clone();
        after.move_across_stages(&"l1".into(), &"b".into(), 0);

        let mut changed: Vec<String> = before
            .changed_positions(&after)
            .into_iter()
            .map(|(id, _, _)| id.to_string())
            .collect();
        changed.sort();
        assert_eq!(changed, vec!["l1", "l2", "l3"]);
    }

    #[test]
    fn test_violations_detects_gaps() {
        let mut board = sample();
        let mut lead = board.lead(&"l2".into()).unwrap().clone();
        lead.order = 4;
        board.store_leads(vec![lead]);

        let violations = board.violations();
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], Violation::NotDense { .. }));
    }
}
