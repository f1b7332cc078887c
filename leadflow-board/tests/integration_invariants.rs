//! Property tests: board invariants survive arbitrary gesture sequences

use leadflow_board::{
    types::{Lead, Pipeline, Stage},
    BoardModel, DragController, EngineConfig, FailurePolicy, LeadFilter, MemoryLeadStore,
    SiblingSync, SyncState,
};
use proptest::prelude::*;
use std::sync::Arc;

const LEADS: [&str; 6] = ["l0", "l1", "l2", "l3", "l4", "l5"];
const TARGETS: [&str; 11] = [
    "l0", "l1", "l2", "l3", "l4", "l5", "a", "b", "c", "h", "nowhere",
];

#[derive(Debug, Clone)]
enum Step {
    Start(usize),
    Over(usize),
    End,
    Cancel,
    Reconcile,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => (0..LEADS.len()).prop_map(Step::Start),
        3 => (0..TARGETS.len()).prop_map(Step::Over),
        1 => Just(Step::End),
        1 => Just(Step::Cancel),
        1 => Just(Step::Reconcile),
    ]
}

fn board() -> BoardModel {
    BoardModel::from_parts(
        [Pipeline::new("sales", "Sales"), Pipeline::new("hiring", "Hiring")],
        [
            Stage::new("a", "sales", "A", 0),
            Stage::new("b", "sales", "B", 1),
            Stage::new("c", "sales", "C", 2),
            Stage::new("h", "hiring", "H", 0),
        ],
        [
            Lead::new("Acme", "a", 0).with_id("l0"),
            Lead::new("Globex", "a", 1).with_id("l1"),
            Lead::new("Initech", "a", 2).with_id("l2"),
            Lead::new("Umbrella", "b", 0).with_id("l3"),
            Lead::new("Hooli", "b", 1).with_id("l4"),
            Lead::new("Candidate", "h", 0).with_id("l5"),
        ],
    )
    .unwrap()
}

fn assert_healthy(board: &BoardModel) {
    assert!(board.violations().is_empty(), "{:?}", board.violations());

    let owned: usize = board
        .stages()
        .map(|s| board.stage_leads(&s.id).len())
        .sum();
    assert_eq!(owned, LEADS.len());
    assert_eq!(board.lead_count(), LEADS.len());

    // leads never change pipeline
    assert_eq!(board.lead(&"l5".into()).unwrap().stage_id, "h");
}

/// Drive the controller outside a runtime: every persist fails with
/// `NoRuntime`, so reconcile exercises the revert path too.
fn run(steps: &[Step], config: EngineConfig, filter: Option<&str>) {
    let initial = board();
    let store = Arc::new(MemoryLeadStore::from_board(&initial));
    let mut ctl = DragController::new(initial, store).with_config(config);
    ctl.set_filter(filter.map(LeadFilter::new));

    for step in steps {
        let before = ctl.board().clone();
        match step {
            Step::Start(i) => {
                ctl.on_gesture_start(LEADS[*i]);
            }
            Step::Over(i) => {
                ctl.on_gesture_over(TARGETS[*i]);
                assert_eq!(ctl.board(), &before, "hover must not touch the board");
            }
            Step::End => {
                ctl.on_gesture_end();
            }
            Step::Cancel => {
                let dragging = ctl.is_dragging();
                ctl.on_gesture_cancel();
                if dragging {
                    assert_eq!(ctl.board(), &before);
                    assert_eq!(ctl.view(), &before);
                }
            }
            Step::Reconcile => {
                ctl.reconcile();
            }
        }
        assert_healthy(ctl.board());
        assert_healthy(ctl.view());
    }
}

/// Drive the controller inside a runtime and settle after every drop. Every
/// persist succeeds, so each commit is confirmed instead of reverted.
fn run_confirmed(steps: &[Step], config: EngineConfig) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let initial = board();
        let store = Arc::new(MemoryLeadStore::from_board(&initial));
        let mut ctl = DragController::new(initial, store.clone()).with_config(config);
        let full_sync = ctl.config().sibling_sync == SiblingSync::AllAffected;

        for step in steps {
            match step {
                Step::Start(i) => {
                    ctl.on_gesture_start(LEADS[*i]);
                }
                Step::Over(i) => {
                    ctl.on_gesture_over(TARGETS[*i]);
                }
                Step::End => {
                    if let Some(outcome) = ctl.on_gesture_end() {
                        ctl.settle().await;
                        assert_eq!(ctl.board().position_of(&outcome.lead_id), Some(outcome.to.clone()));
                        assert_eq!(ctl.sync_state(&outcome.lead_id), SyncState::Confirmed);
                        assert_eq!(store.position(&outcome.lead_id), Some(outcome.to.clone()));
                    }
                }
                Step::Cancel => {
                    ctl.on_gesture_cancel();
                }
                Step::Reconcile => {
                    ctl.reconcile();
                }
            }
            assert_healthy(ctl.board());
            assert_healthy(ctl.view());

            if full_sync && !ctl.is_dragging() {
                for lead in LEADS {
                    let id = lead.into();
                    assert_eq!(store.position(&id), ctl.board().position_of(&id), "{lead}");
                }
            }
        }
    });
}

proptest! {
    #[test]
    fn prop_confirmed_commits_stay_dense(steps in prop::collection::vec(step(), 0..60)) {
        run_confirmed(&steps, EngineConfig::default());
    }

    #[test]
    fn prop_all_affected_store_matches_board(steps in prop::collection::vec(step(), 0..60)) {
        run_confirmed(
            &steps,
            EngineConfig::default().with_sibling_sync(SiblingSync::AllAffected),
        );
    }

    #[test]
    fn prop_invariants_hold_with_revert(steps in prop::collection::vec(step(), 0..60)) {
        run(&steps, EngineConfig::default(), None);
    }

    #[test]
    fn prop_invariants_hold_with_mark_stale(steps in prop::collection::vec(step(), 0..60)) {
        run(
            &steps,
            EngineConfig::default().with_failure_policy(FailurePolicy::MarkStale),
            None,
        );
    }

    #[test]
    fn prop_invariants_hold_under_filter(steps in prop::collection::vec(step(), 0..60)) {
        run(&steps, EngineConfig::default(), Some("o"));
    }

    #[test]
    fn prop_repeated_hover_is_idempotent(lead in 0..5usize, target in 0..TARGETS.len()) {
        let initial = board();
        let store = Arc::new(MemoryLeadStore::from_board(&initial));
        let mut ctl = DragController::new(initial, store);

        ctl.on_gesture_start(LEADS[lead]);
        ctl.on_gesture_over(TARGETS[target]);
        let once = ctl.view().clone();
        ctl.on_gesture_over(TARGETS[target]);
        prop_assert_eq!(ctl.view(), &once);
    }
}
