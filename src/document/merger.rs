/*!
 * Merger / reassembler.
 *
 * Inverts the splitter: the translated outputs of one source file's fragments
 * are re-parsed, their wrappers dropped, and their content units concatenated
 * in `section_index` order inside the wrapper of section 1. The prologue is
 * taken from section 1 and emitted once, which reassembles fragments produced
 * under either prologue policy. Markdown groups are concatenated with their
 * section markers removed.
 *
 * Each fragment group is merged independently. An incomplete or unreadable
 * group is reported and produces no output file; other groups are unaffected.
 */

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::document::markdown;
use crate::document::markup::{self, MarkupDocument};
use crate::errors::{MalformedOutputError, MissingFragmentError, PipelineError, PipelineResult};
use crate::file_utils::FileManager;
use crate::ledger::layout::WorkLayout;
use crate::ledger::models::{DocumentEntry, Manifest, Task, TaskType};
use crate::ledger::status::TaskStatus;
use crate::report::{Issue, PhaseSummary};

/// A successfully reconstructed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedFile {
    pub document_id: String,
    pub parent_file: String,
    pub output_path: PathBuf,
    pub sections: usize,
}

/// Outcome of one merge run
#[derive(Debug, Default)]
pub struct MergeReport {
    pub merged: Vec<MergedFile>,
    pub incomplete: Vec<MissingFragmentError>,
    pub failed: Vec<Issue>,
    pub summary: PhaseSummary,
}

impl MergeReport {
    /// True when every group was reconstructed
    pub fn is_success(&self) -> bool {
        self.incomplete.is_empty() && self.failed.is_empty()
    }
}

/// Merge already ordered fragment contents into one document.
/// Markdown sections (by the extension of `name`) are concatenated without
/// their section markers; markup sections are re-wrapped around all units.
pub fn merge_contents(name: &str, sections: &[String]) -> Result<String, (usize, PipelineError)> {
    if markdown::is_markdown(name) && !sections.is_empty() {
        return Ok(markdown::merge_sections(sections));
    }

    let mut documents = Vec::with_capacity(sections.len());
    for (i, section) in sections.iter().enumerate() {
        let label = format!("{} (section {})", name, i + 1);
        let document = MarkupDocument::parse(&label, section).map_err(|e| (i, PipelineError::from(e)))?;
        documents.push(document);
    }

    let Some(first) = documents.first() else {
        return Err((
            0,
            MissingFragmentError {
                document_id: name.to_string(),
                parent_file: name.to_string(),
                missing: Vec::new(),
            }
            .into(),
        ));
    };

    let units: Vec<String> = documents.iter().flat_map(|doc| doc.units.iter().cloned()).collect();

    Ok(markup::render(first.prologue.as_deref(), &first.header, &units, &first.footer))
}

/// Reassembles translated fragments
pub struct Merger {
    layout: WorkLayout,
}

impl Merger {
    pub fn new(layout: WorkLayout) -> Self {
        Self { layout }
    }

    /// Merge every fragment group of every document in the manifest
    pub fn merge_manifest(&self, manifest: &Manifest) -> MergeReport {
        self.merge_manifest_with_progress(manifest, |_, _| {})
    }

    /// Same as [`Merger::merge_manifest`], reporting `(done, total)` groups
    pub fn merge_manifest_with_progress(
        &self,
        manifest: &Manifest,
        progress_callback: impl Fn(usize, usize),
    ) -> MergeReport {
        let mut report = MergeReport {
            summary: PhaseSummary::new("merge"),
            ..Default::default()
        };

        let groups: Vec<(&DocumentEntry, &str, Vec<&Task>)> = manifest
            .documents
            .iter()
            .flat_map(|document| {
                fragment_groups(document)
                    .into_iter()
                    .map(move |(parent_file, tasks)| (document, parent_file, tasks))
            })
            .collect();
        let total = groups.len();

        for (done, (document, parent_file, tasks)) in groups.into_iter().enumerate() {
            match self.merge_group(&document.document_id, parent_file, tasks) {
                Ok(merged) => {
                    info!(
                        "Merged {} section(s) into {}",
                        merged.sections,
                        merged.output_path.display()
                    );
                    report.summary.processed += 1;
                    report.merged.push(merged);
                }
                Err(PipelineError::MissingFragment(missing)) => {
                    warn!("{}", missing);
                    report.summary.skipped += 1;
                    report.incomplete.push(missing);
                }
                Err(e) => {
                    warn!("Merge of {}/{} failed: {}", document.document_id, parent_file, e);
                    report.summary.failed += 1;
                    report
                        .failed
                        .push(Issue::new(format!("{}/{}", document.document_id, parent_file), e));
                }
            }
            progress_callback(done + 1, total);
        }

        report
    }

    /// Merge one group. Tasks may come in any order; `section_index` decides.
    pub fn merge_group(&self, document_id: &str, parent_file: &str, tasks: Vec<&Task>) -> PipelineResult<MergedFile> {
        let mut tasks = tasks;
        tasks.sort_by_key(|task| task.section_index.unwrap_or(0));

        let total = tasks
            .iter()
            .filter_map(|task| task.total_sections)
            .max()
            .unwrap_or(tasks.len());

        let mut missing = Vec::new();
        for index in 1..=total {
            let at_index: Vec<&&Task> = tasks.iter().filter(|t| t.section_index == Some(index)).collect();
            match at_index.as_slice() {
                [task] if task.status() == TaskStatus::Completed => {}
                [task] => missing.push(task.output_path.clone()),
                [] => missing.push(PathBuf::from(format!("{}#section{}", parent_file, index))),
                duplicates => missing.extend(duplicates.iter().map(|t| t.output_path.clone())),
            }
        }
        if tasks.len() != total && missing.is_empty() {
            missing.extend(
                tasks
                    .iter()
                    .filter(|t| t.section_index.is_none_or(|i| i == 0 || i > total))
                    .map(|t| t.output_path.clone()),
            );
        }
        if !missing.is_empty() {
            return Err(MissingFragmentError {
                document_id: document_id.to_string(),
                parent_file: parent_file.to_string(),
                missing,
            }
            .into());
        }

        let mut sections = Vec::with_capacity(total);
        for task in &tasks {
            sections.push(FileManager::read_to_string(&task.output_path)?);
        }

        let merged = merge_contents(parent_file, &sections).map_err(|(i, e)| malformed(&tasks[i].output_path, e))?;

        let output_path = self.layout.translated_path(document_id, parent_file);
        FileManager::write_atomic(&output_path, &merged)?;

        Ok(MergedFile {
            document_id: document_id.to_string(),
            parent_file: parent_file.to_string(),
            output_path,
            sections: total,
        })
    }

    /// Merge explicitly listed outputs; list position is the section index
    pub fn merge_files(sections: &[PathBuf], output: &Path) -> Result<MergedFile> {
        let name = output.display().to_string();

        let missing: Vec<PathBuf> = sections.iter().filter(|p| !p.is_file()).cloned().collect();
        if !missing.is_empty() || sections.is_empty() {
            return Err(MissingFragmentError {
                document_id: "manual".to_string(),
                parent_file: name,
                missing,
            }
            .into());
        }

        let mut contents = Vec::with_capacity(sections.len());
        for path in sections {
            contents.push(FileManager::read_to_string(path)?);
        }

        let merged = merge_contents(&name, &contents).map_err(|(i, e)| malformed(&sections[i], e))?;
        FileManager::write_atomic(output, &merged)?;
        info!("Merged {} section(s) into {}", sections.len(), output.display());

        Ok(MergedFile {
            document_id: "manual".to_string(),
            parent_file: name,
            output_path: output.to_path_buf(),
            sections: sections.len(),
        })
    }
}

/// Fragment tasks of a document grouped by parent file
pub fn fragment_groups(document: &DocumentEntry) -> BTreeMap<&str, Vec<&Task>> {
    let mut groups: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
    for task in &document.tasks {
        if task.task_type != TaskType::Fragment {
            continue;
        }
        if let Some(parent) = task.parent_file.as_deref() {
            groups.entry(parent).or_default().push(task);
        }
    }
    groups
}

fn malformed(path: &Path, error: PipelineError) -> PipelineError {
    match error {
        PipelineError::Structure(e) => MalformedOutputError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into(),
        other => other,
    }
}
