//! PersistenceBridge - fire-and-forget adapter to a [`LeadStore`]
//!
//! Each request becomes one spawned `update_lead` call. The spawned task never
//! touches board state; its outcome travels back over a channel and is
//! applied by the drag controller on its own thread.

use crate::error::{BoardError, Result};
use crate::store::LeadStore;
use crate::types::{LeadId, LeadPatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Why a lead is being persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistRole {
    /// The lead the user dragged
    Moved,
    /// A lead renumbered as a side effect of the drag
    Sibling,
}

/// One position update for the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistRequest {
    pub lead_id: LeadId,
    pub patch: LeadPatch,
    pub generation: u64,
    pub role: PersistRole,
}

/// A finished persistence call
#[derive(Debug)]
pub struct PersistOutcome {
    pub request: PersistRequest,
    pub result: Result<()>,
}

pub struct PersistenceBridge {
    store: Arc<dyn LeadStore>,
    tx: mpsc::UnboundedSender<PersistOutcome>,
    rx: mpsc::UnboundedReceiver<PersistOutcome>,
    in_flight: usize,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Issue one update on the current tokio runtime and return immediately.
    ///
    /// No batching, no retry. Outside a runtime the request fails at once
    /// with [`BoardError::NoRuntime`].
    pub fn dispatch(&mut self, request: PersistRequest) {
        self.in_flight += 1;

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(lead = %request.lead_id, "no runtime to persist lead move");
            let _ = self.tx.send(PersistOutcome {
                request,
                result: Err(BoardError::NoRuntime),
            });
            return;
        };

        let store = Arc::clone(&self.store);
        let mut delivery = Delivery {
            tx: self.tx.clone(),
            request: Some(request.clone()),
        };

        handle.spawn(async move {
            let result = store.update_lead(&request.lead_id, &request.patch).await;
            match &result {
                Ok(()) => tracing::debug!(
                    lead = %request.lead_id,
                    generation = request.generation,
                    "persisted lead position"
                ),
                Err(e) => tracing::warn!(
                    lead = %request.lead_id,
                    generation = request.generation,
                    error = %e,
                    "failed to persist lead position"
                ),
            }
            delivery.deliver(result);
        });
    }

    /// Number of dispatched requests whose outcome has not been taken yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Take a finished outcome without waiting
    pub fn try_next(&mut self) -> Option<PersistOutcome> {
        let outcome = self.rx.try_recv().ok()?;
        self.in_flight -= 1;
        Some(outcome)
    }

    /// Wait for the next outcome. `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<PersistOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(outcome)
    }
}

/// Sends exactly one outcome per request, even if the store call panics.
struct Delivery {
    tx: mpsc::UnboundedSender<PersistOutcome>,
    request: Option<PersistRequest>,
}

impl Delivery {
    fn deliver(&mut self, result: Result<()>) {
        if let Some(request) = self.request.take() {
            let _ = self.tx.send(PersistOutcome { request, result });
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.deliver(Err(BoardError::rejected("persistence task aborted")));
    }
}
