//! Drag-and-drop reordering engine for CRM lead boards
//!
//! Leads sit in ordered stages, stages belong to pipelines. A drag gesture
//! previews every hover on a throwaway [`WorkingCopy`], commits it over the
//! canonical [`BoardModel`] on drop, and then persists the dragged lead through
//! a [`LeadStore`] without waiting for the result.
//!
//! ## Overview
//!
//! - **Dense ordering** - orders within a stage are always `0..n-1`
//! - **Optimistic commit** - the board changes on drop, persistence follows
//! - **Single writer** - persistence outcomes are applied on the controller's
//!   thread via [`DragController::reconcile`] or [`DragController::settle`]
//! - **Filter-aware** - leads hidden by a [`LeadFilter`] are never drop targets
//!   and never lose their place
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use leadflow_board::{DragController, FileLeadStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileLeadStore::new("/path/to/repo/.leadflow"));
//! let board = store.read_board().await?;
//!
//! let mut controller = DragController::new(board, store);
//! controller.on_gesture_start("01J0LEAD");
//! controller.on_gesture_over("stage-won");
//! controller.on_gesture_end();
//! controller.settle().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Structure
//!
//! ```text
//! repo/
//! └── .leadflow/
//!     ├── board.json           # Board metadata
//!     ├── pipelines/{id}.json
//!     ├── stages/{id}.json
//!     ├── leads/{id}.json      # Lead state, including stage and order
//!     └── activity/
//!         └── current.jsonl    # Move log (one JSON object per line)
//! ```

mod error;
pub mod types;

pub mod board;
pub mod config;
pub mod controller;
pub mod filter;
pub mod pending;
pub mod persistence;
pub mod reorder;
pub mod session;
pub mod store;
pub mod working_copy;

pub use board::{BoardModel, Violation};
pub use config::{EngineConfig, FailurePolicy, SiblingSync};
pub use controller::{DragController, GestureOutcome};
pub use error::{BoardError, Result};
pub use filter::LeadFilter;
pub use pending::{PendingMove, PendingMoves, SyncState};
pub use persistence::{PersistOutcome, PersistRequest, PersistRole, PersistenceBridge};
pub use session::{DragSession, DropTarget};
pub use store::{BoardMeta, FileLeadStore, LeadStore, MemoryLeadStore, StoreLock};
pub use working_copy::WorkingCopy;
