//! Board location and engine configuration for a CLI invocation.

use anyhow::{Context, Result};
use leadflow_board::{EngineConfig, FileLeadStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const BOARD_DIR_NAME: &str = ".leadflow";
const CONFIG_DIR_NAME: &str = "leadflow";
const BOARD_CONFIG_FILE: &str = "leadflow.yaml";
const USER_CONFIG_FILE: &str = "config.yaml";

/// A resolved board directory plus the engine settings that apply to it.
pub struct BoardHandle {
    pub store: Arc<FileLeadStore>,
    pub config: EngineConfig,
    pub config_path: Option<PathBuf>,
}

impl BoardHandle {
    /// Resolve `board` and load configuration.
    ///
    /// An explicit `config` path must exist. Otherwise `<board>/leadflow.yaml`
    /// is used if present, then the per-user config file.
    pub fn open(board: &Path, config: Option<&Path>) -> Result<Self> {
        let root = resolve_board_path(board);

        let config_path = match config {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => [Some(root.join(BOARD_CONFIG_FILE)), user_config_path()]
                .into_iter()
                .flatten()
                .find(|p| p.is_file()),
        };

        let engine = EngineConfig::load(config_path.as_deref()).with_context(|| match &config_path {
            Some(p) => format!("failed to load config from {}", p.display()),
            None => "failed to load config from environment".to_string(),
        })?;

        tracing::debug!(
            board = %root.display(),
            config = ?config_path,
            policy = ?engine.failure_policy,
            sibling_sync = ?engine.sibling_sync,
            "opened board"
        );

        Ok(Self {
            store: Arc::new(FileLeadStore::new(root).with_actor(actor_name())),
            config: engine,
            config_path,
        })
    }
}

/// Resolve a user-provided path to a .leadflow directory path.
///
/// Rules:
/// - If path ends in `.leadflow` and is a directory, use it directly
/// - If we're already inside a `.leadflow` dir, use it (don't nest)
/// - If path is a directory containing `.leadflow/`, use `path/.leadflow`
/// - If the path names a not-yet-created `.leadflow`, use it as is
/// - Otherwise, assume `path/.leadflow`
pub fn resolve_board_path(path: &Path) -> PathBuf {
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    for ancestor in path.ancestors() {
        if ancestor.file_name().and_then(|n| n.to_str()) == Some(BOARD_DIR_NAME) && ancestor.is_dir() {
            return ancestor.to_path_buf();
        }
    }

    if path.file_name().and_then(|n| n.to_str()) == Some(BOARD_DIR_NAME) {
        return path;
    }

    path.join(BOARD_DIR_NAME)
}

/// Name recorded on activity log entries
fn actor_name() -> String {
    std::env::var("LEADFLOW_ACTOR")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "leadflow".to_string())
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(USER_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_board::FailurePolicy;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_existing_board_dir() {
        let tmp = TempDir::new().unwrap();
        let board_dir = tmp.path().join(".leadflow");
        std::fs::create_dir_all(&board_dir).unwrap();

        let result = resolve_board_path(&board_dir);
        assert_eq!(result, board_dir.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_parent_containing_board() {
        let tmp = TempDir::new().unwrap();
        let board_dir = tmp.path().join(".leadflow");
        std::fs::create_dir_all(&board_dir).unwrap();

        let result = resolve_board_path(tmp.path());
        assert_eq!(result, board_dir.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_inside_board_dir() {
        let tmp = TempDir::new().unwrap();
        let board_dir = tmp.path().join(".leadflow");
        let leads_dir = board_dir.join("leads");
        std::fs::create_dir_all(&leads_dir).unwrap();

        let result = resolve_board_path(&leads_dir);
        assert_eq!(result, board_dir.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_missing_board_dir() {
        let tmp = TempDir::new().unwrap();

        let named = tmp.path().join(".leadflow");
        assert_eq!(resolve_board_path(&named), named);

        let result = resolve_board_path(tmp.path());
        assert_eq!(result, tmp.path().canonicalize().unwrap().join(".leadflow"));
    }

    #[test]
    fn test_open_reads_board_config() {
        let tmp = TempDir::new().unwrap();
        let board_dir = tmp.path().join(".leadflow");
        std::fs::create_dir_all(&board_dir).unwrap();
        std::fs::write(board_dir.join("leadflow.yaml"), "failure_policy: mark_stale\n").unwrap();

        let handle = BoardHandle::open(tmp.path(), None).unwrap();
        assert_eq!(handle.config.failure_policy, FailurePolicy::MarkStale);
        assert_eq!(handle.store.root(), board_dir.canonicalize().unwrap());
    }

    #[test]
    fn test_open_missing_explicit_config_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.yaml");
        assert!(BoardHandle::open(tmp.path(), Some(&missing)).is_err());
    }
}
