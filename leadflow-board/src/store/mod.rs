//! Persistence boundary
//!
//! The engine only ever asks a store to apply a position patch to one lead.
//! Loading boards and CRUD belong to whoever owns the store.

mod file;
mod memory;

pub use file::{BoardMeta, FileLeadStore, StoreLock};
pub use memory::MemoryLeadStore;

use crate::error::Result;
use crate::types::{LeadId, LeadPatch};
use async_trait::async_trait;

/// Backend that persists lead positions.
///
/// Best effort: an update may fail for network, auth or validation reasons.
/// Callers do not retry.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn update_lead(&self, lead_id: &LeadId, patch: &LeadPatch) -> Result<()>;
}
