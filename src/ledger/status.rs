use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::file_utils::FileManager;
use crate::ledger::models::Task;

/// Lifecycle of one externally performed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Nothing observed yet
    Pending,
    /// A worker has claimed the task
    InProgress,
    /// Output published and status recorded
    Completed,
    /// The worker gave up on the task
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

impl TaskStatus {
    /// Derive a task's status from its side-channel files.
    ///
    /// An explicit `failed`, `in_progress` or `pending` record wins. Otherwise
    /// the task is completed once its output exists and the status file is
    /// absent, unrecognized or says `completed`.
    pub fn observe(output_path: &Path, status_path: &Path) -> TaskStatus {
        let recorded = fs::read_to_string(status_path)
            .ok()
            .and_then(|content| content.parse::<TaskStatus>().ok());

        match recorded {
            Some(TaskStatus::Failed) => TaskStatus::Failed,
            Some(TaskStatus::InProgress) => TaskStatus::InProgress,
            Some(TaskStatus::Pending) => TaskStatus::Pending,
            Some(TaskStatus::Completed) | None if output_path.is_file() => TaskStatus::Completed,
            _ => TaskStatus::Pending,
        }
    }
}

/// Worker-side publication of outputs and statuses.
///
/// Every write goes through a temporary file renamed into place, so readers
/// never observe a partially written output or status.
pub struct StatusBoard;

impl StatusBoard {
    /// Record `status` for `task`
    pub fn mark(task: &Task, status: TaskStatus) -> Result<()> {
        FileManager::write_atomic(&task.status_path, &status.to_string())
    }

    /// Publish the translated output, then mark the task completed
    pub fn publish_output(task: &Task, content: &str) -> Result<()> {
        FileManager::write_atomic(&task.output_path, content)?;
        Self::mark(task, TaskStatus::Completed)
    }
}
