//! WorkingCopy - the gesture-scoped shadow of the board

use crate::board::BoardModel;
use crate::types::{LeadId, StageId};

/// Mutable shadow of [`BoardModel`] used to preview a drag before commit.
///
/// Seeded from the board at gesture start, mutated on every hover, and then
/// either committed over the board or reseeded from it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCopy {
    board: BoardModel,
}

impl WorkingCopy {
    pub fn seed(board: &BoardModel) -> Self {
        Self {
            board: board.clone(),
        }
    }

    /// Throw away every mutation and start again from `board`
    pub fn reseed(&mut self, board: &BoardModel) {
        self.board.clone_from(board);
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    /// Whether the copy has diverged from `board`
    pub fn matches(&self, board: &BoardModel) -> bool {
        &self.board == board
    }

    pub fn reorder_within_stage(&mut self, active_id: &LeadId, target_id: &LeadId) -> bool {
        self.board.reorder_within_stage(active_id, target_id)
    }

    pub fn move_across_stages(
        &mut self,
        active_id: &LeadId,
        target_stage_id: &StageId,
        insertion_index: usize,
    ) -> bool {
        self.board
            .move_across_stages(active_id, target_stage_id, insertion_index)
    }

    /// Replace `board` with this copy's state
    pub fn commit_into(&self, board: &mut BoardModel) {
        board.clone_from(&self.board);
    }
}
