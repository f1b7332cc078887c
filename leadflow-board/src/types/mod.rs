//! Core types for the board engine

mod ids;
mod lead;
mod log;
mod stage;

// Re-export all types
pub use ids::{LeadId, LogEntryId, PipelineId, StageId};
pub use lead::{Lead, LeadPatch, LeadPosition};
pub use log::LogEntry;
pub use stage::{Pipeline, Stage};
