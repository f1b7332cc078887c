//! FileLeadStore - directory-backed board storage
//!
//! Layout under the root directory:
//!
//! ```text
//! .leadflow/
//! ├── board.json              # Board metadata
//! ├── pipelines/{id}.json
//! ├── stages/{id}.json
//! ├── leads/{id}.json
//! └── activity/current.jsonl  # One applied patch per line
//! ```
//!
//! Entity ids are taken from file names. Writes go through a temp file and a
//! rename, and are serialized in-process by a mutex and across processes by
//! an advisory lock file.

use super::LeadStore;
use crate::board::BoardModel;
use crate::error::{BoardError, Result};
use crate::reorder;
use crate::types::{
    Lead, LeadId, LeadPatch, LogEntry, Pipeline, PipelineId, Stage, StageId,
};
use async_trait::async_trait;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Board metadata stored in `board.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMeta {
    pub name: String,
}

/// Lead store backed by a directory of JSON files
pub struct FileLeadStore {
    root: PathBuf,
    actor: Option<String>,
    writer: Mutex<()>,
}

impl FileLeadStore {
    /// Create a store for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            actor: None,
            writer: Mutex::new(()),
        }
    }

    /// Attribute activity log entries to `actor`
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn board_path(&self) -> PathBuf {
        self.root.join("board.json")
    }

    pub fn pipelines_dir(&self) -> PathBuf {
        self.root.join("pipelines")
    }

    pub fn stages_dir(&self) -> PathBuf {
        self.root.join("stages")
    }

    pub fn leads_dir(&self) -> PathBuf {
        self.root.join("leads")
    }

    pub fn activity_dir(&self) -> PathBuf {
        self.root.join("activity")
    }

    pub fn pipeline_path(&self, id: &PipelineId) -> PathBuf {
        self.pipelines_dir().join(format!("{}.json", id))
    }

    pub fn stage_path(&self, id: &StageId) -> PathBuf {
        self.stages_dir().join(format!("{}.json", id))
    }

    pub fn lead_path(&self, id: &LeadId) -> PathBuf {
        self.leads_dir().join(format!("{}.json", id))
    }

    pub fn activity_path(&self) -> PathBuf {
        self.activity_dir().join("current.jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.board_path().exists()
    }

    /// Create the directory structure. Idempotent.
    pub async fn create_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(self.pipelines_dir()).await?;
        fs::create_dir_all(self.stages_dir()).await?;
        fs::create_dir_all(self.leads_dir()).await?;
        fs::create_dir_all(self.activity_dir()).await?;
        Ok(())
    }

    // =========================================================================
    // Board I/O
    // =========================================================================

    pub async fn read_meta(&self) -> Result<BoardMeta> {
        if !self.is_initialized() {
            return Err(BoardError::NotInitialized {
                path: self.root.clone(),
            });
        }
        let content = fs::read_to_string(self.board_path()).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load every pipeline, stage and lead into a normalized board
    pub async fn read_board(&self) -> Result<BoardModel> {
        if !self.is_initialized() {
            return Err(BoardError::NotInitialized {
                path: self.root.clone(),
            });
        }

        let mut pipelines = Vec::new();
        for (id, mut pipeline) in read_entities::<Pipeline>(&self.pipelines_dir()).await? {
            pipeline.id = PipelineId::from_string(id);
            pipelines.push(pipeline);
        }

        let mut stages = Vec::new();
        for (id, mut stage) in read_entities::<Stage>(&self.stages_dir()).await? {
            stage.id = StageId::from_string(id);
            stages.push(stage);
        }

        let mut leads = Vec::new();
        for (id, mut lead) in read_entities::<Lead>(&self.leads_dir()).await? {
            lead.id = LeadId::from_string(id);
            leads.push(lead);
        }

        BoardModel::from_parts(pipelines, stages, leads)
    }

    /// Write a whole board, creating the store if needed.
    ///
    /// Fails with `AlreadyExists` on an initialized store unless `overwrite`
    /// is set, in which case existing entity files are removed first.
    pub async fn write_board(&self, meta: &BoardMeta, board: &BoardModel, overwrite: bool) -> Result<()> {
        let _guard = self.writer.lock().await;

        if self.is_initialized() {
            if !overwrite {
                return Err(BoardError::AlreadyExists {
                    path: self.root.clone(),
                });
            }
            for dir in [self.pipelines_dir(), self.stages_dir(), self.leads_dir()] {
                if dir.exists() {
                    fs::remove_dir_all(&dir).await?;
                }
            }
        }

        self.create_directories().await?;
        let _lock = self.lock().await?;

        for pipeline in board.pipelines() {
            write_json(&self.pipeline_path(&pipeline.id), pipeline).await?;
        }
        for stage in board.stages() {
            write_json(&self.stage_path(&stage.id), stage).await?;
        }
        for lead in board.leads() {
            write_json(&self.lead_path(&lead.id), lead).await?;
        }
        write_json(&self.board_path(), meta).await?;

        tracing::info!(
            root = %self.root.display(),
            leads = board.lead_count(),
            "wrote board"
        );
        Ok(())
    }

    pub async fn read_lead(&self, id: &LeadId) -> Result<Lead> {
        let path = self.lead_path(id);
        if !path.exists() {
            return Err(BoardError::LeadNotFound { id: id.to_string() });
        }
        let content = fs::read_to_string(&path).await?;
        let mut lead: Lead = serde_json::from_str(&content)?;
        lead.id = id.clone();
        Ok(lead)
    }

    // =========================================================================
    // Activity logging
    // =========================================================================

    async fn append_activity(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.activity_path())
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read activity entries, newest first
    pub async fn read_activity(&self, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        let path = self.activity_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut entries: Vec<LogEntry> = content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        entries.reverse();

        if let Some(limit) = limit {
            entries.truncate(limit);
        }

        Ok(entries)
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Try to acquire the cross-process lock (non-blocking)
    pub async fn lock(&self) -> Result<StoreLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(StoreLock { file }),
            Err(_) => Err(BoardError::LockBusy),
        }
    }
}

#[async_trait]
impl LeadStore for FileLeadStore {
    async fn update_lead(&self, lead_id: &LeadId, patch: &LeadPatch) -> Result<()> {
        let _guard = self.writer.lock().await;
        let _lock = self.lock().await?;

        let mut lead = self.read_lead(lead_id).await?;
        if let Some(stage_id) = &patch.stage_id {
            if !self.stage_path(stage_id).exists() {
                return Err(BoardError::StageNotFound {
                    id: stage_id.to_string(),
                });
            }
        }

        let source_stage = lead.stage_id.clone();
        lead.apply_patch(patch);
        let resettled = self.resettle(&lead, &source_stage).await?;

        let mut entry = LogEntry::moved(lead_id.clone(), patch.clone());
        if let Some(actor) = &self.actor {
            entry = entry.with_actor(actor.clone());
        }
        self.append_activity(&entry).await?;

        tracing::debug!(lead = %lead_id, ?patch, resettled, "applied lead patch");
        Ok(())
    }
}

impl FileLeadStore {
    /// Write `moved` at its patched index and renumber the stages it left
    /// and entered, so stored orders stay dense after a single-lead write.
    ///
    /// Returns the number of other leads whose stored order changed.
    async fn resettle(&self, moved: &Lead, source_stage: &StageId) -> Result<usize> {
        let mut neighbours = Vec::new();
        for (id, mut lead) in read_entities::<Lead>(&self.leads_dir()).await? {
            lead.id = LeadId::from_string(id);
            if lead.id != moved.id
                && (lead.stage_id == moved.stage_id || &lead.stage_id == source_stage)
            {
                neighbours.push(lead);
            }
        }
        neighbours.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let (mut target, source): (Vec<Lead>, Vec<Lead>) = neighbours
            .into_iter()
            .partition(|l| l.stage_id == moved.stage_id);
        let at = moved.order.min(target.len());
        target.insert(at, moved.clone());

        let mut resettled = 0;
        for mut stage in [target, source] {
            let before: Vec<usize> = stage.iter().map(|l| l.order).collect();
            reorder::renumber(&mut stage);
            for (lead, old) in stage.iter().zip(before) {
                if lead.id == moved.id {
                    write_json(&self.lead_path(&lead.id), lead).await?;
                } else if lead.order != old {
                    write_json(&self.lead_path(&lead.id), lead).await?;
                    resettled += 1;
                }
            }
        }
        Ok(resettled)
    }
}

/// RAII lock guard - releases on drop
pub struct StoreLock {
    file: std::fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Read every `{id}.json` entity in a directory
async fn read_entities<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(String, T)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let content = fs::read_to_string(&path).await?;
            found.push((stem.to_string(), serde_json::from_str(&content)?));
        }
    }
    Ok(found)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    atomic_write(path, content.as_bytes()).await
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}
