//! Error types for the board engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur in board operations
#[derive(Debug, Error)]
pub enum BoardError {
    /// Board not initialized at the given path
    #[error("board not initialized at {path}")]
    NotInitialized { path: PathBuf },

    /// Board already exists
    #[error("board already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// Lead not found
    #[error("lead not found: {id}")]
    LeadNotFound { id: String },

    /// Stage not found
    #[error("stage not found: {id}")]
    StageNotFound { id: String },

    /// Pipeline not found
    #[error("pipeline not found: {id}")]
    PipelineNotFound { id: String },

    /// Duplicate ID
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// A lead may only move between stages of the same pipeline
    #[error("lead '{lead}' cannot move from pipeline '{from}' to pipeline '{to}'")]
    CrossPipelineMove {
        lead: String,
        from: String,
        to: String,
    },

    /// The store refused the update
    #[error("update rejected: {message}")]
    Rejected { message: String },

    /// Lock is held by another process
    #[error("lock busy - another operation in progress")]
    LockBusy,

    /// Persistence was requested outside a tokio runtime
    #[error("no async runtime available to run persistence")]
    NoRuntime,

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BoardError {
    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.into(),
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockBusy | Self::NoRuntime)
    }
}

impl From<figment::Error> for BoardError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
