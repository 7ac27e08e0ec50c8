//! Applying remediation tasks to a live index.

use super::task::TaskQueue;
use crate::error::{IndexSyncError, Result};
use crate::transport::ClusterClient;
use serde::Serialize;

/// Final state of one audit after its tasks were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remediation {
    pub consistent: bool,
    pub tasks_applied: usize,
}

/// Run mapping tasks in order against an open index.
pub async fn run_mapping_tasks(client: &ClusterClient, index: &str, mut queue: TaskQueue) -> Result<usize> {
    if queue.is_empty() {
        return Ok(0);
    }
    tracing::info!("[REMEDIATE {}] {} mapping tasks to perform", index, queue.len());
    queue.drain(client, index).await
}

/// Run settings tasks inside a close / run / reopen bracket.
///
/// A failed close aborts before any task runs and leaves the index as it
/// was. Once closed, the index is reopened whatever the tasks did, and a
/// failed reopen is reported as [`IndexSyncError::StuckClosed`] even when
/// a task failed first.
pub async fn run_settings_tasks(client: &ClusterClient, index: &str, mut queue: TaskQueue) -> Result<usize> {
    if queue.is_empty() {
        return Ok(0);
    }
    tracing::info!("[REMEDIATE {}] {} settings tasks to perform", index, queue.len());

    if let Err(e) = client.close_index(index).await {
        tracing::error!("[REMEDIATE {}] failed to close index: {}", index, e);
        return Err(e);
    }

    let outcome = queue.drain(client, index).await;

    if let Err(e) = client.open_index(index).await {
        tracing::error!("[REMEDIATE {}] failed to reopen index: {}", index, e);
        return Err(IndexSyncError::StuckClosed {
            index: index.to_string(),
            source: Box::new(e),
        });
    }

    outcome
}
