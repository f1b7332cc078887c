//! DragController - gesture lifecycle orchestration
//!
//! The controller owns the canonical [`BoardModel`], the gesture-scoped
//! [`WorkingCopy`] and at most one [`DragSession`]. Every lifecycle entry point
//! is synchronous and infallible: malformed input degrades to a logged no-op.
//!
//! ```text
//! start ──► over* ──► end    (commit working copy, persist moved lead)
//!                └──► cancel (reseed working copy from board)
//! ```
//!
//! Persistence runs on spawned tasks. Their outcomes are only applied by
//! [`DragController::reconcile`] or [`DragController::settle`], and never
//! while a gesture is active, so the board has exactly one writer.

use crate::board::BoardModel;
use crate::config::{EngineConfig, FailurePolicy, SiblingSync};
use crate::filter::{self, LeadFilter};
use crate::pending::{PendingMove, PendingMoves, SyncState};
use crate::persistence::{PersistOutcome, PersistRequest, PersistRole, PersistenceBridge};
use crate::reorder;
use crate::session::{DragSession, DropTarget};
use crate::store::LeadStore;
use crate::types::{Lead, LeadId, LeadPatch, LeadPosition, StageId};
use crate::working_copy::WorkingCopy;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a completed gesture did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GestureOutcome {
    pub lead_id: LeadId,
    pub from: LeadPosition,
    pub to: LeadPosition,
    pub generation: u64,
    /// Number of persistence requests dispatched
    pub persisted: usize,
}

impl GestureOutcome {
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

pub struct DragController {
    board: BoardModel,
    working: WorkingCopy,
    session: Option<DragSession>,
    filter: Option<LeadFilter>,
    config: EngineConfig,
    bridge: PersistenceBridge,
    pending: PendingMoves,
    generation: u64,
}

impl DragController {
    pub fn new(board: BoardModel, store: Arc<dyn LeadStore>) -> Self {
        let working = WorkingCopy::seed(&board);
        Self {
            board,
            working,
            session: None,
            filter: None,
            config: EngineConfig::default(),
            bridge: PersistenceBridge::new(store),
            pending: PendingMoves::new(),
            generation: 0,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // =========================================================================
    // Read access for the rendering layer
    // =========================================================================

    /// The canonical board
    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    /// What should be drawn: the working copy during a gesture, else the board
    pub fn view(&self) -> &BoardModel {
        if self.session.is_some() {
            self.working.board()
        } else {
            &self.board
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// The lead being dragged, for a ghost overlay
    pub fn active_lead(&self) -> Option<&Lead> {
        let session = self.session.as_ref()?;
        self.working.board().lead(&session.active_lead_id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn filter(&self) -> Option<&LeadFilter> {
        self.filter.as_ref()
    }

    /// Narrow visible leads. An empty term clears the filter.
    pub fn set_filter(&mut self, filter: Option<LeadFilter>) {
        self.filter = filter.filter(|f| !f.is_empty());
    }

    /// A stage's visible leads in display order
    pub fn visible_leads(&self, stage_id: &StageId) -> Vec<Lead> {
        self.view()
            .stage_leads(stage_id)
            .into_iter()
            .filter(|l| filter::is_visible(l, self.filter.as_ref()))
            .collect()
    }

    /// The drop target at a visible position within a stage.
    ///
    /// Positions past the last visible lead address the stage itself.
    pub fn target_at(&self, stage_id: &StageId, visible_index: usize) -> Option<DropTarget> {
        self.view().stage(stage_id)?;
        let full = self.view().stage_leads(stage_id);
        let index = filter::visible_to_full_index(&full, self.filter.as_ref(), visible_index);
        Some(match full.get(index) {
            Some(lead) => DropTarget::Lead(lead.id.clone()),
            None => DropTarget::Stage(stage_id.clone()),
        })
    }

    pub fn sync_state(&self, lead_id: &LeadId) -> SyncState {
        self.pending.state(lead_id)
    }

    /// Persistence requests whose outcome has not been applied yet
    pub fn in_flight(&self) -> usize {
        self.bridge.in_flight()
    }

    // =========================================================================
    // Gesture lifecycle
    // =========================================================================

    /// Begin dragging `lead_id`. Returns whether a session was created.
    pub fn on_gesture_start(&mut self, lead_id: impl Into<LeadId>) -> bool {
        let lead_id = lead_id.into();

        if let Some(session) = &self.session {
            debug!(active = %session.active_lead_id, requested = %lead_id, "gesture already active");
            return false;
        }

        let Some(lead) = self.board.lead(&lead_id) else {
            debug!(lead = %lead_id, "cannot start gesture on unknown lead");
            return false;
        };

        let source_stage_id = lead.stage_id.clone();
        self.working.reseed(&self.board);
        debug!(lead = %lead_id, stage = %source_stage_id, "gesture started");
        self.session = Some(DragSession::new(lead_id, source_stage_id));
        true
    }

    /// The pointer moved over `over_id` (a lead or a stage).
    ///
    /// Returns whether the working copy changed. A repeat of the last applied
    /// target is ignored, so calling this twice with the same id is the same
    /// as calling it once. Hovering the dragged lead itself means the pointer
    /// left that target, so the next hover over it applies again.
    pub fn on_gesture_over(&mut self, over_id: &str) -> bool {
        if let Some(session) = self.session.as_mut() {
            if session.active_lead_id == over_id {
                session.last_over = None;
                return false;
            }
        }
        let Some(session) = &self.session else {
            debug!(over = over_id, "hover without an active gesture");
            return false;
        };

        let Some(target) = self.resolve_target(over_id) else {
            debug!(over = over_id, "hover over unknown or hidden target");
            return false;
        };
        if session.is_last_over(&target) {
            return false;
        }

        let active_id = session.active_lead_id.clone();
        let Some(current_stage) = self
            .working
            .board()
            .lead(&active_id)
            .map(|l| l.stage_id.clone())
        else {
            debug!(lead = %active_id, "active lead vanished from working copy");
            return false;
        };

        let (target_stage, over_lead) = match &target {
            DropTarget::Lead(id) => match self.working.board().lead(id) {
                Some(lead) => (lead.stage_id.clone(), Some(id.clone())),
                None => return false,
            },
            DropTarget::Stage(id) => (id.clone(), None),
        };

        if !self.working.board().same_pipeline(&current_stage, &target_stage) {
            debug!(lead = %active_id, from = %current_stage, to = %target_stage, "ignoring cross-pipeline hover");
            return false;
        }

        let changed = match over_lead {
            Some(over) if target_stage == current_stage => {
                self.working.reorder_within_stage(&active_id, &over)
            }
            None if target_stage == current_stage => false,
            over => {
                let index = reorder::insertion_index(
                    &self.working.board().stage_leads(&target_stage),
                    over.as_ref(),
                );
                self.working
                    .move_across_stages(&active_id, &target_stage, index)
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.last_over = Some(target);
        }
        changed
    }

    /// Commit the working copy and persist the dragged lead.
    ///
    /// Returns `None` when no gesture was active.
    pub fn on_gesture_end(&mut self) -> Option<GestureOutcome> {
        let session = self.session.take()?;
        let lead_id = session.active_lead_id;

        let (Some(from), Some(to)) = (
            self.board.position_of(&lead_id),
            self.working.board().position_of(&lead_id),
        ) else {
            debug!(lead = %lead_id, "dragged lead no longer exists, discarding gesture");
            self.working.reseed(&self.board);
            return None;
        };

        let siblings = match self.config.sibling_sync {
            SiblingSync::AllAffected => self.board.changed_positions(self.working.board()),
            SiblingSync::MovedOnly => Vec::new(),
        };
        self.working.commit_into(&mut self.board);
        self.generation += 1;
        let generation = self.generation;

        info!(lead = %lead_id, from = ?from, to = ?to, generation, "gesture committed");

        let mut persisted = 0;
        if from != to || self.config.persist_unchanged {
            self.persist(&lead_id, &from, &to, generation, PersistRole::Moved);
            persisted += 1;
        }

        for (sibling, before, after) in siblings {
            if sibling != lead_id {
                self.persist(&sibling, &before, &after, generation, PersistRole::Sibling);
                persisted += 1;
            }
        }

        Some(GestureOutcome {
            lead_id,
            from,
            to,
            generation,
            persisted,
        })
    }

    /// Abandon the gesture. The board is left exactly as it was at start.
    pub fn on_gesture_cancel(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        self.working.reseed(&self.board);
        debug!(lead = %session.active_lead_id, "gesture cancelled");
        true
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Apply every persistence outcome that has already arrived.
    ///
    /// Deferred while a gesture is active. Returns the number applied.
    pub fn reconcile(&mut self) -> usize {
        if self.session.is_some() {
            return 0;
        }
        let mut applied = 0;
        while let Some(outcome) = self.bridge.try_next() {
            self.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Wait for every in-flight persistence call and apply its outcome.
    ///
    /// Does nothing while a gesture is active.
    pub async fn settle(&mut self) -> usize {
        if self.session.is_some() {
            return 0;
        }
        let mut applied = 0;
        while let Some(outcome) = self.bridge.next().await {
            self.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Replace the board with a fresh copy from the backend.
    ///
    /// Clears pending and stale marks. An active gesture is cancelled.
    pub fn replace_board(&mut self, board: BoardModel) {
        if let Some(session) = self.session.take() {
            debug!(lead = %session.active_lead_id, "board refresh cancelled active gesture");
        }
        self.board = board;
        self.working.reseed(&self.board);
        self.pending.clear();
    }

    fn persist(
        &mut self,
        lead_id: &LeadId,
        previous: &LeadPosition,
        committed: &LeadPosition,
        generation: u64,
        role: PersistRole,
    ) {
        self.pending.record(
            lead_id.clone(),
            PendingMove {
                generation,
                role,
                previous: previous.clone(),
                committed: committed.clone(),
            },
        );
        self.bridge.dispatch(PersistRequest {
            lead_id: lead_id.clone(),
            patch: LeadPatch::position(committed),
            generation,
            role,
        });
    }

    fn apply_outcome(&mut self, outcome: PersistOutcome) {
        let PersistOutcome { request, result } = outcome;

        let error = match result {
            Ok(()) => {
                self.pending.confirm(&request.lead_id, request.generation);
                return;
            }
            Err(error) => error,
        };

        let Some(entry) = self.pending.take(&request.lead_id, request.generation) else {
            debug!(lead = %request.lead_id, generation = request.generation, "ignoring failure superseded by a newer change");
            return;
        };

        match (entry.role, self.config.failure_policy) {
            (PersistRole::Moved, FailurePolicy::Revert) => self.revert(&request.lead_id, &entry),
            _ => {
                warn!(lead = %request.lead_id, %error, "keeping unpersisted position, marked stale");
                self.pending.mark_stale(request.lead_id);
            }
        }
    }

    fn revert(&mut self, lead_id: &LeadId, entry: &PendingMove) {
        if self.board.position_of(lead_id).as_ref() != Some(&entry.committed) {
            warn!(lead = %lead_id, "lead moved since failed commit, marked stale instead of reverting");
            self.pending.mark_stale(lead_id.clone());
            return;
        }

        match self.board.move_lead(lead_id, &entry.previous) {
            Ok(()) => {
                self.working.reseed(&self.board);
                warn!(lead = %lead_id, to = ?entry.previous, "reverted lead after failed persistence");
            }
            Err(e) => {
                warn!(lead = %lead_id, error = %e, "could not revert lead, marked stale");
                self.pending.mark_stale(lead_id.clone());
            }
        }
    }

    /// Classify a hovered id against the working copy.
    ///
    /// Leads hidden by the filter are not valid targets.
    fn resolve_target(&self, over_id: &str) -> Option<DropTarget> {
        let board = self.working.board();

        let lead_id = LeadId::from(over_id);
        if let Some(lead) = board.lead(&lead_id) {
            return filter::is_visible(lead, self.filter.as_ref()).then_some(DropTarget::Lead(lead_id));
        }

        let stage_id = StageId::from(over_id);
        board.stage(&stage_id).map(|_| DropTarget::Stage(stage_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLeadStore;
    use crate::types::{Pipeline, Stage};

    fn board() -> BoardModel {
        BoardModel::from_parts(
            [Pipeline::new("sales", "Sales"), Pipeline::new("hiring", "Hiring")],
            [
                Stage::new("a", "sales", "A", 0),
                Stage::new("b", "sales", "B", 1),
                Stage::new("h", "hiring", "H", 0),
            ],
            [
                Lead::new("Acme", "a", 0).with_id("l1"),
                Lead::new("Globex", "a", 1).with_id("l2"),
                Lead::new("Initech", "a", 2).with_id("l3"),
            ],
        )
        .unwrap()
    }

    fn controller() -> (Arc<MemoryLeadStore>, DragController) {
        let board = board();
        let store = Arc::new(MemoryLeadStore::from_board(&board));
        let controller = DragController::new(board, store.clone());
        (store, controller)
    }

    fn ids(board: &BoardModel, stage: &str) -> Vec<String> {
        board
            .stage_leads(&stage.into())
            .iter()
            .map(|l| l.id.to_string())
            .collect()
    }

    #[test]
    fn test_start_creates_session_without_mutation() {
        let (_store, mut ctl) = controller();
        assert!(ctl.on_gesture_start("l2"));

        let session = ctl.session().unwrap();
        assert_eq!(session.active_lead_id, "l2");
        assert_eq!(session.source_stage_id, "a");
        assert_eq!(ctl.active_lead().unwrap().name, "Globex");
        assert_eq!(ctl.view(), ctl.board());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (_store, mut ctl) = controller();
        assert!(ctl.on_gesture_start("l1"));
        assert!(!ctl.on_gesture_start("l2"));
        assert_eq!(ctl.session().unwrap().active_lead_id, "l1");
    }

    #[test]
    fn test_start_unknown_lead() {
        let (_store, mut ctl) = controller();
        assert!(!ctl.on_gesture_start("ghost"));
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn test_over_self_and_unknown_are_noops() {
        let (_store, mut ctl) = controller();
        ctl.on_gesture_start("l1");
        assert!(!ctl.on_gesture_over("l1"));
        assert!(!ctl.on_gesture_over("nothing-here"));
        assert_eq!(ctl.view(), ctl.board());
    }

    #[test]
    fn test_over_self_forgets_last_target() {
        let (_store, mut ctl) = controller();
        ctl.on_gesture_start("l1");
        ctl.on_gesture_over("l2");
        assert!(ctl.session().unwrap().last_over.is_some());

        ctl.on_gesture_over("l1");
        assert!(ctl.session().unwrap().last_over.is_none());
    }

    #[test]
    fn test_over_without_session() {
        let (_store, mut ctl) = controller();
        assert!(!ctl.on_gesture_over("l2"));
    }

    #[test]
    fn test_over_only_touches_working_copy() {
        let (_store, mut ctl) = controller();
        ctl.on_gesture_start("l3");
        assert!(ctl.on_gesture_over("l1"));

        assert_eq!(ids(ctl.view(), "a"), vec!["l3", "l1", "l2"]);
        assert_eq!(ids(ctl.board(), "a"), vec!["l1", "l2", "l3"]);
    }

    #[test]
    fn test_over_own_stage_is_noop() {
        let (_store, mut ctl) = controller();
        ctl.on_gesture_start("l1");
        assert!(!ctl.on_gesture_over("a"));
        assert_eq!(ctl.view(), ctl.board());
    }

    #[test]
    fn test_cross_pipeline_hover_is_noop() {
        let (_store, mut ctl) = controller();
        ctl.on_gesture_start("l1");
        assert!(!ctl.on_gesture_over("h"));
        assert_eq!(ctl.view(), ctl.board());
    }

    #[test]
    fn test_hidden_lead_is_not_a_target() {
        let (_store, mut ctl) = controller();
        ctl.set_filter(Some(LeadFilter::new("acme")));
        ctl.on_gesture_start("l1");
        assert!(!ctl.on_gesture_over("l3"));
        assert_eq!(ctl.visible_leads(&"a".into()).len(), 1);
    }

    #[test]
    fn test_target_at_skips_hidden_leads() {
        let (_store, mut ctl) = controller();
        ctl.set_filter(Some(LeadFilter::new("i")));
        let stage = StageId::from("a");

        // visible: Initech (l3) only
        assert_eq!(ctl.target_at(&stage, 0), Some(DropTarget::Lead("l3".into())));
        assert_eq!(ctl.target_at(&stage, 1), Some(DropTarget::Stage(stage.clone())));
        assert_eq!(ctl.target_at(&"zz".into(), 0), None);
    }

    #[test]
    fn test_empty_filter_is_cleared() {
        let (_store, mut ctl) = controller();
        ctl.set_filter(Some(LeadFilter::new("   ")));
        assert!(ctl.filter().is_none());
    }

    #[test]
    fn test_cancel_restores_working_copy() {
        let (store, mut ctl) = controller();
        let original = ctl.board().clone();
        ctl.on_gesture_start("l3");
        ctl.on_gesture_over("b");

        assert!(ctl.on_gesture_cancel());
        assert!(!ctl.is_dragging());
        assert_eq!(ctl.board(), &original);
        assert_eq!(ctl.view(), &original);
        assert!(store.calls().is_empty());
        assert!(!ctl.on_gesture_cancel());
    }

    #[test]
    fn test_end_without_session() {
        let (_store, mut ctl) = controller();
        assert!(ctl.on_gesture_end().is_none());
    }

    #[test]
    fn test_reconcile_is_deferred_during_gesture() {
        let (_store, mut ctl) = controller();
        ctl.on_gesture_start("l1");
        assert_eq!(ctl.reconcile(), 0);
    }

    #[tokio::test]
    async fn test_end_commits_and_persists_moved_lead() {
        let (store, mut ctl) = controller();
        ctl.on_gesture_start("l1");
        ctl.on_gesture_over("b");
        let outcome = ctl.on_gesture_end().unwrap();

        assert!(outcome.moved());
        assert_eq!(outcome.to, LeadPosition::new("b", 0));
        assert_eq!(outcome.persisted, 1);
        assert_eq!(ids(ctl.board(), "b"), vec!["l1"]);
        assert_eq!(ctl.sync_state(&"l1".into()), SyncState::Pending);

        assert_eq!(ctl.settle().await, 1);
        assert_eq!(ctl.sync_state(&"l1".into()), SyncState::Confirmed);
        assert_eq!(store.position(&"l1".into()), Some(LeadPosition::new("b", 0)));
    }

    #[tokio::test]
    async fn test_unchanged_gesture_can_skip_persistence() {
        let (store, ctl) = controller();
        let mut ctl = ctl.with_config(EngineConfig::default().with_persist_unchanged(false));
        ctl.on_gesture_start("l1");
        let outcome = ctl.on_gesture_end().unwrap();

        assert!(!outcome.moved());
        assert_eq!(outcome.persisted, 0);
        ctl.settle().await;
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_replace_board_cancels_gesture_and_clears_marks() {
        let (store, mut ctl) = controller();
        store.fail_all();
        let ctl_config = EngineConfig::default().with_failure_policy(FailurePolicy::MarkStale);
        ctl = ctl.with_config(ctl_config);

        ctl.on_gesture_start("l1");
        ctl.on_gesture_over("b");
        ctl.on_gesture_end();
        ctl.settle().await;
        assert_eq!(ctl.sync_state(&"l1".into()), SyncState::Stale);

        ctl.on_gesture_start("l2");
        ctl.on_gesture_over("b");
        ctl.replace_board(board());

        assert!(!ctl.is_dragging());
        assert_eq!(ctl.view(), &board());
        assert_eq!(ctl.sync_state(&"l1".into()), SyncState::Confirmed);
    }
}
