use chrono::Local;
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::document::markdown;
use crate::document::splitter::Fragment;
use crate::file_utils::round2;
use crate::ledger::layout::{self, WorkLayout};
use crate::ledger::models::{DocumentEntry, Manifest, ProjectInfo, Statistics, Task, TaskType, Thresholds};

/// Incrementally assigns tasks while analysis walks the source tree.
///
/// Ids are derived from `(document_id, file key, fragment index)`. Collisions
/// (two documents or files sanitizing to the same key) are resolved by
/// appending a short digest of the original name, so every task gets its own
/// input, output and status paths.
pub struct LedgerBuilder {
    layout: WorkLayout,
    project: ProjectInfo,
    documents: Vec<DocumentEntry>,
    document_ids: HashSet<String>,
    task_ids: HashSet<String>,
    file_keys: HashSet<String>,
    skipped_files: usize,
}

impl LedgerBuilder {
    pub fn new(layout: WorkLayout, config: &Config) -> Self {
        let project = ProjectInfo {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            work_dir: layout.work_dir().to_path_buf(),
            thresholds: Thresholds::from(config),
            created_at: Local::now().to_rfc3339(),
        };

        Self {
            layout,
            project,
            documents: Vec::new(),
            document_ids: HashSet::new(),
            task_ids: HashSet::new(),
            file_keys: HashSet::new(),
            skipped_files: 0,
        }
    }

    pub fn layout(&self) -> &WorkLayout {
        &self.layout
    }

    /// Start a new document; subsequent tasks are attached to it.
    /// Returns the (possibly disambiguated) document id.
    pub fn begin_document(&mut self, name: &str, title: &str, source_path: &Path) -> String {
        let base = layout::document_id_for(name);
        let mut document_id = base.clone();
        if self.document_ids.contains(&document_id) {
            let digest = layout::short_digest(name);
            document_id = format!("{}_{}", base, digest);
            let mut attempt = 1;
            while self.document_ids.contains(&document_id) {
                document_id = format!("{}_{}_{}", base, digest, attempt);
                attempt += 1;
            }
        }
        self.document_ids.insert(document_id.clone());
        self.file_keys.clear();

        debug!("Ledger document {} ({})", document_id, title);

        self.documents.push(DocumentEntry {
            document_id: document_id.clone(),
            title: title.to_string(),
            source_path: source_path.to_path_buf(),
            tasks: Vec::new(),
        });

        document_id
    }

    /// Add a single task for a whole markup document or an extracted unit record
    pub fn add_whole(
        &mut self,
        relative: &str,
        input_path: &Path,
        size_kb: f64,
        task_type: TaskType,
    ) -> Option<&Task> {
        let document_id = self.documents.last()?.document_id.clone();
        let key = self.reserve_key(&document_id, relative, |id| vec![id.to_string()]);
        let task_id = format!("{}_{}", document_id, key);

        let task = Task {
            task_id: task_id.clone(),
            document_id: document_id.clone(),
            task_type,
            input_path: input_path.to_path_buf(),
            output_path: self.layout.translated_path(&document_id, relative),
            status_path: self.layout.status_path(&task_id),
            size_estimate: round2(size_kb),
            parent_file: None,
            section_index: None,
            total_sections: None,
        };

        self.push(task)
    }

    /// Add one task per fragment of `relative`, in section order.
    /// Returns the tasks so the caller can write each fragment's input file.
    pub fn add_fragments(&mut self, relative: &str, fragments: &[Fragment], size_kb: f64) -> Vec<Task> {
        let Some(document_id) = self.documents.last().map(|doc| doc.document_id.clone()) else {
            return Vec::new();
        };
        let total = fragments.len();
        let key = self.reserve_key(&document_id, relative, |id| {
            (1..=total).map(|n| format!("{}_p{}", id, n)).collect()
        });
        let share = if total == 0 { 0.0 } else { round2(size_kb / total as f64) };
        let extension = if markdown::is_markdown(relative) { "md" } else { "xhtml" };

        let mut added = Vec::with_capacity(total);
        for fragment in fragments {
            let index = fragment.section_index;
            let task_id = format!("{}_{}_p{}", document_id, key, index);
            let task = Task {
                task_id: task_id.clone(),
                document_id: document_id.clone(),
                task_type: TaskType::Fragment,
                input_path: self.layout.fragment_input(&document_id, &key, index, extension),
                output_path: self.layout.fragment_output(&document_id, &key, index, extension),
                status_path: self.layout.status_path(&task_id),
                size_estimate: share,
                parent_file: Some(relative.to_string()),
                section_index: Some(index),
                total_sections: Some(fragment.total_sections),
            };
            if let Some(task) = self.push(task) {
                added.push(task.clone());
            }
        }

        added
    }

    /// Count a file that analysis could not turn into tasks
    pub fn skip_file(&mut self) {
        self.skipped_files += 1;
    }

    /// Freeze the ledger into a manifest with aggregate statistics
    pub fn finish(self) -> Manifest {
        let mut tasks_by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_tasks = 0;

        for task in self.documents.iter().flat_map(|doc| doc.tasks.iter()) {
            *tasks_by_type.entry(task.task_type.to_string()).or_insert(0) += 1;
            total_tasks += 1;
        }

        let statistics = Statistics {
            total_documents: self.documents.len(),
            total_tasks,
            tasks_by_type,
            skipped_files: self.skipped_files,
            completed: 0,
            in_progress: 0,
            failed: 0,
        };

        Manifest {
            project: self.project,
            documents: self.documents,
            statistics,
        }
    }

    /// Pick a file key whose derived task ids are all unused
    fn reserve_key<F>(&mut self, document_id: &str, relative: &str, ids_for: F) -> String
    where
        F: Fn(&str) -> Vec<String>,
    {
        let base = layout::file_key_for(relative);
        let is_free = |builder: &Self, key: &str| {
            !builder.file_keys.contains(key)
                && ids_for(&format!("{}_{}", document_id, key))
                    .iter()
                    .all(|id| !builder.task_ids.contains(id))
        };

        let key = if is_free(self, &base) {
            base
        } else {
            let digest = layout::short_digest(relative);
            let mut candidate = format!("{}_{}", base, digest);
            let mut attempt = 1;
            while !is_free(self, &candidate) {
                candidate = format!("{}_{}_{}", base, digest, attempt);
                attempt += 1;
            }
            candidate
        };

        self.file_keys.insert(key.clone());
        key
    }

    fn push(&mut self, task: Task) -> Option<&Task> {
        self.task_ids.insert(task.task_id.clone());
        let document = self.documents.last_mut()?;
        document.tasks.push(task);
        document.tasks.last()
    }
}

/// Every path a task of `manifest` reads or writes; used to assert disjointness
pub fn written_paths(manifest: &Manifest) -> Vec<PathBuf> {
    manifest
        .tasks()
        .flat_map(|task| {
            [
                task.input_path.clone(),
                task.output_path.clone(),
                task.status_path.clone(),
            ]
        })
        .collect()
}
