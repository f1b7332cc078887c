//! Subcommand handlers.

use crate::seed::Seed;
use crate::state::BoardHandle;
use anyhow::{Context, Result};
use leadflow_board::types::{LeadPosition, PipelineId, StageId};
use leadflow_board::{
    filter, BoardError, BoardModel, DragController, DropTarget, LeadFilter, SyncState,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

/// `leadflow import`
pub async fn import(handle: &BoardHandle, seed: &Path, force: bool) -> Result<()> {
    let (meta, board) = Seed::load(seed)?.into_board()?;

    handle
        .store
        .write_board(&meta, &board, force)
        .await
        .map_err(|e| match e {
            BoardError::AlreadyExists { .. } => anyhow::anyhow!("{e} (use --force to replace it)"),
            other => other.into(),
        })?;

    println!(
        "Imported '{}': {} pipeline(s), {} stage(s), {} lead(s) into {}",
        meta.name,
        board.pipelines().count(),
        board.stages().count(),
        board.lead_count(),
        handle.store.root().display()
    );
    Ok(())
}

/// `leadflow show`
pub async fn show(
    handle: &BoardHandle,
    pipeline: Option<&str>,
    filter: Option<&str>,
    as_json: bool,
) -> Result<()> {
    let board = load_board(handle).await?;
    let filter = filter.map(LeadFilter::new).filter(|f| !f.is_empty());

    let pipelines: Vec<PipelineId> = match pipeline {
        Some(id) => {
            let id = PipelineId::from(id);
            if board.pipeline(&id).is_none() {
                return Err(BoardError::PipelineNotFound { id: id.to_string() }.into());
            }
            vec![id]
        }
        None => board.pipelines().map(|p| p.id.clone()).collect(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&board_json(&board, &pipelines, filter.as_ref()))?);
        return Ok(());
    }

    for pipeline_id in &pipelines {
        let Some(pipeline) = board.pipeline(pipeline_id) else {
            continue;
        };
        println!("{} [{}]", pipeline.name, pipeline.id);

        for stage in board.stages_in(pipeline_id) {
            let leads = board.stage_leads(&stage.id);
            let visible = filter::visible(&leads, filter.as_ref());
            if filter.is_some() {
                println!("  {} [{}] ({}/{})", stage.name, stage.id, visible.len(), leads.len());
            } else {
                println!("  {} [{}] ({})", stage.name, stage.id, leads.len());
            }

            for lead in visible {
                let mut line = format!("    {}. {} [{}]", lead.order, lead.name, lead.id);
                if let Some(value) = lead.value {
                    line.push_str(&format!(" ${value:.0}"));
                }
                if !lead.tags.is_empty() {
                    line.push_str(&format!(" #{}", lead.tags.join(" #")));
                }
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn board_json(
    board: &BoardModel,
    pipelines: &[PipelineId],
    filter: Option<&LeadFilter>,
) -> serde_json::Value {
    let pipelines: Vec<_> = pipelines
        .iter()
        .filter_map(|id| board.pipeline(id))
        .map(|pipeline| {
            let stages: Vec<_> = board
                .stages_in(&pipeline.id)
                .into_iter()
                .map(|stage| {
                    let leads = board.stage_leads(&stage.id);
                    let leads: Vec<_> = filter::visible(&leads, filter)
                        .into_iter()
                        .map(|lead| {
                            json!({
                                "id": lead.id,
                                "name": lead.name,
                                "order": lead.order,
                                "value": lead.value,
                                "tags": lead.tags,
                            })
                        })
                        .collect();
                    json!({ "id": stage.id, "name": stage.name, "leads": leads })
                })
                .collect();
            json!({ "id": pipeline.id, "name": pipeline.name, "stages": stages })
        })
        .collect();
    json!({ "pipelines": pipelines })
}

/// `leadflow drag`
pub async fn drag(
    handle: &BoardHandle,
    lead: &str,
    over: &[String],
    cancel: bool,
    filter: Option<&str>,
) -> Result<()> {
    let board = load_board(handle).await?;
    let mut controller =
        DragController::new(board, handle.store.clone()).with_config(handle.config.clone());
    controller.set_filter(filter.map(LeadFilter::new));

    if !controller.on_gesture_start(lead) {
        return Err(BoardError::LeadNotFound { id: lead.to_string() }.into());
    }

    for target in over {
        let over_id = resolve_over(&controller, target)
            .with_context(|| format!("invalid hover target '{target}'"))?;
        let changed = controller.on_gesture_over(&over_id);
        tracing::debug!(over = %over_id, changed, "hover");
    }

    if cancel {
        controller.on_gesture_cancel();
        println!("Cancelled drag of {lead}; board unchanged");
        return Ok(());
    }

    let Some(outcome) = controller.on_gesture_end() else {
        anyhow::bail!("no gesture to end for lead {lead}");
    };
    controller.settle().await;

    let state = controller.sync_state(&outcome.lead_id);
    let current = controller.board().position_of(&outcome.lead_id);

    if current.as_ref() != Some(&outcome.to) {
        anyhow::bail!(
            "failed to persist move of {}; reverted to {}",
            outcome.lead_id,
            current.as_ref().map(describe).unwrap_or_else(|| "nowhere".into())
        );
    }
    if state == SyncState::Stale {
        anyhow::bail!(
            "failed to persist move of {}; kept at {} locally",
            outcome.lead_id,
            describe(&outcome.to)
        );
    }

    if outcome.moved() {
        println!(
            "Moved {}: {} -> {}",
            outcome.lead_id,
            describe(&outcome.from),
            describe(&outcome.to)
        );
    } else {
        println!("{} stays at {}", outcome.lead_id, describe(&outcome.to));
    }
    Ok(())
}

/// Accept `<stage>:<n>` as the n-th visible lead of a stage, otherwise pass
/// the id through.
fn resolve_over(controller: &DragController, target: &str) -> Result<String> {
    let Some((stage, index)) = target.rsplit_once(':') else {
        return Ok(target.to_string());
    };
    let index: usize = index.parse().context("position must be a number")?;
    let stage_id = StageId::from(stage);
    controller
        .target_at(&stage_id, index)
        .map(|t: DropTarget| t.id().to_string())
        .ok_or_else(|| BoardError::StageNotFound { id: stage.to_string() }.into())
}

fn describe(position: &LeadPosition) -> String {
    format!("{}#{}", position.stage_id, position.order)
}

/// `leadflow check`
///
/// Loading already rejects dangling references and duplicates; stored orders
/// are compared before normalization.
pub async fn check(handle: &BoardHandle) -> Result<()> {
    let board = load_board(handle).await?;
    let mut problems: Vec<String> = board.violations().iter().map(|v| v.to_string()).collect();

    let mut stored: BTreeMap<StageId, Vec<usize>> = BTreeMap::new();
    for lead in board.leads() {
        let raw = handle.store.read_lead(&lead.id).await?;
        stored.entry(raw.stage_id).or_default().push(raw.order);
    }
    for (stage, mut orders) in stored {
        orders.sort_unstable();
        if !orders.iter().copied().eq(0..orders.len()) {
            problems.push(format!("stage '{stage}' has non-dense stored orders {orders:?}"));
        }
    }

    if problems.is_empty() {
        println!(
            "Board OK: {} lead(s) in {} stage(s)",
            board.lead_count(),
            board.stages().count()
        );
        return Ok(());
    }

    for problem in &problems {
        eprintln!("  {problem}");
    }
    anyhow::bail!("{} problem(s) found", problems.len())
}

/// `leadflow log`
pub async fn log(handle: &BoardHandle, limit: Option<usize>) -> Result<()> {
    if !handle.store.is_initialized() {
        return Err(BoardError::NotInitialized {
            path: handle.store.root().to_path_buf(),
        }
        .into());
    }

    for entry in handle.store.read_activity(limit).await? {
        let position = match (&entry.patch.stage_id, entry.patch.order) {
            (Some(stage), Some(order)) => format!("{stage}#{order}"),
            (Some(stage), None) => stage.to_string(),
            (None, Some(order)) => format!("#{order}"),
            (None, None) => "-".to_string(),
        };
        println!(
            "{} {} {} -> {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.op,
            entry.lead_id,
            position,
            entry.actor.map(|a| format!(" ({a})")).unwrap_or_default()
        );
    }
    Ok(())
}

async fn load_board(handle: &BoardHandle) -> Result<BoardModel> {
    handle
        .store
        .read_board()
        .await
        .with_context(|| format!("failed to load board from {}", handle.store.root().display()))
}
