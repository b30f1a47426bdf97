/*!
 * Analysis phase.
 *
 * Walks a source root of already-extracted volumes, decides for every markup
 * or markdown file whether it is translated whole or split into fragments,
 * registers pre-extracted unit records, and produces the manifest. Fragment inputs are
 * written under the work directory as they are produced.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::document::markdown::{self, MARKDOWN_EXTENSIONS, MarkdownSplitter};
use crate::document::splitter::Splitter;
use crate::errors::ConfigurationError;
use crate::file_utils::FileManager;
use crate::ledger::builder::LedgerBuilder;
use crate::ledger::layout::WorkLayout;
use crate::ledger::models::{Manifest, TaskType};
use crate::report::{Issue, PhaseSummary};

/// Markup extensions considered translatable documents
pub const MARKUP_EXTENSIONS: &[&str] = &["xhtml", "html", "htm", "xml"];

/// Extension of pre-extracted unit records
pub const RECORD_EXTENSION: &str = "json";

/// Every extension the pipeline plans, merges, extracts and verifies
pub fn translatable_extensions() -> Vec<&'static str> {
    let mut extensions: Vec<&str> = MARKUP_EXTENSIONS.to_vec();
    extensions.extend_from_slice(MARKDOWN_EXTENSIONS);
    extensions.push(RECORD_EXTENSION);
    extensions
}

/// Result of one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub manifest: Manifest,
    pub summary: PhaseSummary,
    pub issues: Vec<Issue>,
}

impl AnalysisReport {
    /// True when every file became tasks and every package was readable
    pub fn is_clean(&self) -> bool {
        self.summary.is_clean() && self.issues.is_empty()
    }
}

/// Turns a source tree into a manifest
pub struct Analyzer {
    config: Config,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Analyze every volume under `source_root`.
    ///
    /// A missing source root is a `ConfigurationError`; problems with single
    /// files are recorded as issues and the file is skipped.
    pub fn analyze(&self, source_root: &Path, work_dir: &Path) -> Result<AnalysisReport> {
        self.analyze_with_progress(source_root, work_dir, |_, _| {})
    }

    /// Same as [`Analyzer::analyze`], reporting `(done, total)` volumes
    pub fn analyze_with_progress(
        &self,
        source_root: &Path,
        work_dir: &Path,
        progress_callback: impl Fn(usize, usize),
    ) -> Result<AnalysisReport> {
        if !FileManager::dir_exists(source_root) {
            return Err(ConfigurationError(format!(
                "source directory not found: {}",
                source_root.display()
            ))
            .into());
        }

        let layout = WorkLayout::new(work_dir);
        FileManager::ensure_dir(layout.work_dir())?;

        let splitter = Splitter::new(self.config.split.parts, self.config.split.prologue_policy);
        let mut builder = LedgerBuilder::new(layout, &self.config);
        let mut summary = PhaseSummary::new("analyze");
        let mut issues = Vec::new();

        let volumes = discover_volumes(source_root)?;
        info!("Found {} volume(s) under {}", volumes.len(), source_root.display());

        for (done, volume) in volumes.iter().enumerate() {
            let name = volume
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "volume".to_string());
            let title = match read_package_title(volume) {
                Ok(title) => title,
                Err(e) => {
                    warn!("No title for {}: {:#}", name, e);
                    issues.push(Issue::new(format!("{}/<package>", name), format!("{:#}", e)));
                    None
                }
            };
            let title = title.unwrap_or_else(|| name.clone());
            let document_id = builder.begin_document(&name, &title, volume);

            for file in FileManager::find_files(volume, &translatable_extensions())? {
                let relative = FileManager::relative_path(&file, volume)?;
                if relative.starts_with("META-INF/") {
                    continue;
                }

                match self.analyze_file(&mut builder, &splitter, &file, &relative) {
                    Ok(()) => summary.processed += 1,
                    Err(e) => {
                        warn!("Skipping {}/{}: {}", document_id, relative, e);
                        builder.skip_file();
                        summary.skipped += 1;
                        issues.push(Issue::new(format!("{}/{}", document_id, relative), format!("{:#}", e)));
                    }
                }
            }
            progress_callback(done + 1, volumes.len());
        }

        let manifest = builder.finish();
        info!(
            "Analysis planned {} task(s) across {} document(s)",
            manifest.statistics.total_tasks, manifest.statistics.total_documents
        );

        Ok(AnalysisReport {
            manifest,
            summary,
            issues,
        })
    }

    fn analyze_file(
        &self,
        builder: &mut LedgerBuilder,
        splitter: &Splitter,
        file: &Path,
        relative: &str,
    ) -> Result<()> {
        let size_kb = FileManager::file_size_kb(file)?;

        if has_extension(file, RECORD_EXTENSION) {
            let task_type = classify_record(file)?;
            builder.add_whole(relative, file, size_kb, task_type);
            return Ok(());
        }

        if size_kb < self.config.split.threshold_kb {
            debug!("{} ({} KB) translated whole", relative, size_kb);
            builder.add_whole(relative, file, size_kb, TaskType::WholeDocument);
            return Ok(());
        }

        let content = FileManager::read_to_string(file)?;
        let fragments = if markdown::is_markdown(relative) {
            MarkdownSplitter::new(self.config.split.markdown_max_tokens).split(relative, &content)
        } else {
            splitter.split(relative, &content)?
        };
        let tasks = builder.add_fragments(relative, &fragments, size_kb);

        for (task, fragment) in tasks.iter().zip(&fragments) {
            FileManager::write_to_file(&task.input_path, &fragment.content)?;
            if let Some(output_dir) = task.output_path.parent() {
                FileManager::ensure_dir(output_dir)?;
            }
        }
        debug!("{} ({} KB) split into {} fragment(s)", relative, size_kb, fragments.len());

        Ok(())
    }
}

/// Volumes are the immediate sub-directories holding translatable files,
/// or the root itself when it holds them directly.
pub fn discover_volumes(source_root: &Path) -> Result<Vec<PathBuf>> {
    let extensions = translatable_extensions();

    let mut volumes = Vec::new();
    let entries = fs::read_dir(source_root)
        .with_context(|| format!("Failed to list directory: {}", source_root.display()))?;
    for entry in entries {
        let path = entry.context("Failed to read directory entry")?.path();
        if path.is_dir() && !FileManager::find_files(&path, &extensions)?.is_empty() {
            volumes.push(path);
        }
    }
    volumes.sort();

    if volumes.is_empty() && !FileManager::find_files(source_root, &extensions)?.is_empty() {
        volumes.push(source_root.to_path_buf());
    }

    Ok(volumes)
}

/// Task type of a pre-extracted unit record
pub fn classify_record(path: &Path) -> Result<TaskType> {
    let content = FileManager::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid unit record: {}", path.display()))?;

    record_task_type(&value).ok_or_else(|| {
        anyhow::anyhow!(
            "Unit record has no text, data or title field: {}",
            path.display()
        )
    })
}

/// Task type implied by a record's fields; `None` for unrecognized records
pub fn record_task_type(record: &Value) -> Option<TaskType> {
    if record.get("text").is_some() {
        Some(TaskType::TextBlock)
    } else if record.get("data").is_some() {
        Some(TaskType::Table)
    } else if record.get("title").is_some() {
        Some(TaskType::Metadata)
    } else {
        None
    }
}

/// Title from the first package (`.opf`) file of a volume
pub fn read_package_title(volume: &Path) -> Result<Option<String>> {
    let Some(package) = FileManager::find_files(volume, &["opf"])?.into_iter().next() else {
        return Ok(None);
    };
    let content = FileManager::read_to_string(&package)?;

    let mut reader = Reader::from_str(&content);
    let mut in_title = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"title" => in_title = true,
            Ok(Event::Text(t)) if in_title => {
                let title = t.unescape().map(|s| s.trim().to_string()).unwrap_or_default();
                return Ok((!title.is_empty()).then_some(title));
            }
            Ok(Event::End(_)) => in_title = false,
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                warn!("Unreadable package file {}: {}", package.display(), e);
                return Ok(None);
            }
            _ => {}
        }
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
}
