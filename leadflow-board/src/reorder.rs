//! Pure reordering functions
//!
//! Every function takes an explicit snapshot of a stage's ordered lead list
//! and returns a new list. Nothing here reads or writes shared state, so the
//! drag controller can re-run them against the working copy as often as the
//! pointer fires.
//!
//! All lists are expected in display order (ascending `order`). Results are
//! always renumbered so `order == index`.

use crate::types::{Lead, LeadId, StageId};

/// Result of moving a lead from one stage's list into another's
#[derive(Debug, Clone, PartialEq)]
pub struct CrossStageMove {
    pub source: Vec<Lead>,
    pub target: Vec<Lead>,
}

/// Assign `order = index` to every lead
pub fn renumber(leads: &mut [Lead]) {
    for (index, lead) in leads.iter_mut().enumerate() {
        lead.order = index;
    }
}

/// Check that the orders in `leads` form `0..n-1` with no gaps or duplicates
pub fn is_dense(leads: &[Lead]) -> bool {
    let mut orders: Vec<usize> = leads.iter().map(|l| l.order).collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(index, order)| index == *order)
}

/// Index of a lead within a list
pub fn index_of(leads: &[Lead], id: &LeadId) -> Option<usize> {
    leads.iter().position(|l| &l.id == id)
}

/// Move `active_id` to the slot currently held by `target_id` within one stage.
///
/// Remove-then-insert, then renumber. If either id is missing the input is
/// returned unchanged.
pub fn reorder_within_stage(mut leads: Vec<Lead>, active_id: &LeadId, target_id: &LeadId) -> Vec<Lead> {
    let (Some(from), Some(to)) = (index_of(&leads, active_id), index_of(&leads, target_id)) else {
        return leads;
    };
    if from == to {
        return leads;
    }

    let moved = leads.remove(from);
    leads.insert(to, moved);
    renumber(&mut leads);
    leads
}

/// Move `active_id` out of `source` and into `target` at `insertion_index`.
///
/// The index is clamped to `[0, target.len()]`. The moved lead's `stage_id`
/// becomes `target_stage_id`. If `active_id` is not in `source` both lists
/// come back unchanged.
pub fn move_across_stages(
    mut source: Vec<Lead>,
    mut target: Vec<Lead>,
    active_id: &LeadId,
    target_stage_id: &StageId,
    insertion_index: usize,
) -> CrossStageMove {
    let Some(from) = index_of(&source, active_id) else {
        return CrossStageMove { source, target };
    };

    let mut moved = source.remove(from);
    renumber(&mut source);

    moved.stage_id = target_stage_id.clone();
    let at = insertion_index.min(target.len());
    target.insert(at, moved);
    renumber(&mut target);

    CrossStageMove { source, target }
}

/// Insertion index for a drop onto `over` within the full `target` list.
///
/// Dropping onto a lead lands immediately before it; dropping onto the stage
/// itself (or an id not in the list) appends after every lead.
pub fn insertion_index(target: &[Lead], over: Option<&LeadId>) -> usize {
    over.and_then(|id| index_of(target, id))
        .unwrap_or(target.len())
}
