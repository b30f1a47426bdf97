/*!
 * Ledger records persisted in the manifest.
 *
 * The manifest is written once by analysis and treated as frozen afterwards.
 * Task completion is never written back into it; it is observed from each
 * task's output/status side channel.
 */

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_config::{Config, ProloguePolicy};
use crate::errors::{ConfigurationError, PipelineError, PipelineResult};
use crate::file_utils::FileManager;
use crate::ledger::status::TaskStatus;

/// Kind of work a task represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// A markup file small enough to translate in one piece
    WholeDocument,
    /// One section of a split markup file
    Fragment,
    /// Extracted text block record
    TextBlock,
    /// Extracted table record
    Table,
    /// Document metadata record
    Metadata,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::WholeDocument => "whole_document",
            TaskType::Fragment => "fragment",
            TaskType::TextBlock => "text_block",
            TaskType::Table => "table",
            TaskType::Metadata => "metadata",
        }
    }

    /// Whether the task's input and output are markup documents
    pub fn is_markup(&self) -> bool {
        matches!(self, TaskType::WholeDocument | TaskType::Fragment)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of externally performed work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub document_id: String,
    pub task_type: TaskType,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub status_path: PathBuf,
    /// Advisory size in KB, used for reporting only
    pub size_estimate: f64,
    /// Source file (relative to the volume) a fragment was cut from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sections: Option<usize>,
}

impl Task {
    /// Observe the task's current status from disk
    pub fn status(&self) -> TaskStatus {
        TaskStatus::observe(&self.output_path, &self.status_path)
    }
}

/// Thresholds the analysis ran with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub split_threshold_kb: f64,
    pub split_parts: usize,
    pub prologue_policy: ProloguePolicy,
    #[serde(default)]
    pub markdown_max_tokens: usize,
    pub max_tokens: usize,
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Self {
            split_threshold_kb: config.split.threshold_kb,
            split_parts: config.split.parts,
            prologue_policy: config.split.prologue_policy,
            markdown_max_tokens: config.split.markdown_max_tokens,
            max_tokens: config.packing.max_tokens,
        }
    }
}

/// Project-level settings recorded in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub source_language: String,
    pub target_language: String,
    pub work_dir: PathBuf,
    pub thresholds: Thresholds,
    /// RFC 3339 timestamp of the analysis run
    pub created_at: String,
}

/// One analyzed volume and its ordered tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub document_id: String,
    pub title: String,
    pub source_path: PathBuf,
    pub tasks: Vec<Task>,
}

/// Aggregate counts. Completion counters are written as zero and only
/// recomputed on demand through [`Manifest::progress`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_documents: usize,
    pub total_tasks: usize,
    pub tasks_by_type: BTreeMap<String, usize>,
    pub skipped_files: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub failed: usize,
}

/// Observed task states across a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl Progress {
    pub fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    /// Percentage of completed tasks
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} completed ({:.1}%), {} in progress, {} failed, {} pending",
            self.completed,
            self.total,
            self.percent_complete(),
            self.in_progress,
            self.failed,
            self.pending
        )
    }
}

/// The project ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub project: ProjectInfo,
    pub documents: Vec<DocumentEntry>,
    pub statistics: Statistics,
}

impl Manifest {
    /// Load a manifest. A missing file is a configuration error.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.is_file() {
            return Err(ConfigurationError(format!("manifest not found: {}", path.display())).into());
        }

        let content = fs::read_to_string(path).map_err(|e| PipelineError::file(path, e))?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Persist the manifest atomically
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        FileManager::write_atomic(path, &json)
    }

    /// All tasks in document order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.documents.iter().flat_map(|doc| doc.tasks.iter())
    }

    pub fn document(&self, document_id: &str) -> Option<&DocumentEntry> {
        self.documents.iter().find(|doc| doc.document_id == document_id)
    }

    /// Recompute task states from the side-channel files
    pub fn progress(&self) -> Progress {
        let mut progress = Progress::default();
        for task in self.tasks() {
            progress.record(task.status());
        }
        progress
    }
}
