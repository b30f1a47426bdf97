use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::batching::extract::{Extractor, ValidationManifest};
use crate::document::markdown::{self, MarkdownSplitter, SectionsManifest};
use crate::document::merger::{MergeReport, MergedFile, Merger};
use crate::errors::ConfigurationError;
use crate::file_utils::FileManager;
use crate::ledger::analysis::{AnalysisReport, Analyzer};
use crate::ledger::layout::WorkLayout;
use crate::ledger::models::{Manifest, Progress};
use crate::report::PhaseSummary;
use crate::validation::verifier::{VerificationReport, Verifier};

// @module: Application controller running one pipeline phase per call

/// What the verify phase inspects
#[derive(Debug, Clone)]
pub enum VerifyTarget {
    /// Every document of a manifest, under `<work_dir>/translated/<document_id>`
    Manifest { work_dir: PathBuf, manifest: Option<PathBuf> },
    /// A single directory audited as one document
    Directory(PathBuf),
}

/// Main application controller for the document pipeline
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a controller, rejecting invalid configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze `source_root` and write the manifest (default `<work_dir>/manifest.json`)
    pub fn analyze(&self, source_root: &Path, work_dir: &Path, manifest_path: Option<&Path>) -> Result<AnalysisReport> {
        let start_time = Instant::now();
        let layout = WorkLayout::new(work_dir);

        let progress_bar = Self::progress_bar("volumes");
        let analyzer = Analyzer::new(self.config.clone());
        let report = analyzer.analyze_with_progress(source_root, work_dir, |done, total| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
        })?;
        progress_bar.finish_and_clear();

        let manifest_path = manifest_path.map(Path::to_path_buf).unwrap_or_else(|| layout.manifest_path());
        report
            .manifest
            .save(&manifest_path)
            .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;
        info!("Manifest written to {}", manifest_path.display());

        for issue in &report.issues {
            warn!("{}: {}", issue.subject, issue.error);
        }
        self.log_summary(&layout, &report.summary, start_time.elapsed());

        Ok(report)
    }

    /// Merge every fragment group listed in the manifest
    pub fn merge(&self, work_dir: &Path, manifest_path: Option<&Path>) -> Result<MergeReport> {
        let start_time = Instant::now();
        let layout = WorkLayout::new(work_dir);
        let manifest = Self::load_manifest(&layout, manifest_path)?;

        let progress_bar = Self::progress_bar("groups");
        let report = Merger::new(layout.clone()).merge_manifest_with_progress(&manifest, |done, total| {
            progress_bar.set_length(total as u64);
            progress_bar.set_position(done as u64);
        });
        progress_bar.finish_and_clear();

        for missing in &report.incomplete {
            for path in &missing.missing {
                warn!("  missing: {}", path.display());
            }
        }
        self.log_summary(&layout, &report.summary, start_time.elapsed());

        Ok(report)
    }

    /// Split one markdown file into standalone `section_NNN.md` files
    pub fn split_markdown(&self, input: &Path, output_dir: &Path) -> Result<SectionsManifest> {
        if !FileManager::file_exists(input) {
            return Err(ConfigurationError(format!("markdown file not found: {}", input.display())).into());
        }

        let splitter = MarkdownSplitter::new(self.config.split.markdown_max_tokens);
        markdown::write_sections(&splitter, input, output_dir)
    }

    /// Merge explicitly listed section outputs, in list order
    pub fn merge_sections(&self, sections: &[PathBuf], output: &Path) -> Result<MergedFile> {
        Merger::merge_files(sections, output)
    }

    /// Extract translated text under `dir` into token-bounded review chunks
    pub fn extract_validation(&self, dir: &Path, output_dir: &Path) -> Result<ValidationManifest> {
        if !FileManager::dir_exists(dir) {
            return Err(ConfigurationError(format!("directory not found: {}", dir.display())).into());
        }

        let extractor = Extractor::new(self.config.packing.clone());
        let extraction = extractor.extract_directory(dir)?;
        if extraction.files.is_empty() {
            warn!("No reviewable text found under {}", dir.display());
        }
        info!(
            "Extracted text from {} file(s), skipped {}",
            extraction.files.len(),
            extraction.issues.len()
        );

        extractor.write_chunks(&extraction, output_dir)
    }

    /// Audit translated output; optionally save the JSON report
    pub fn verify(&self, target: &VerifyTarget, output_report: Option<&Path>) -> Result<VerificationReport> {
        let start_time = Instant::now();

        let (report, layout) = match target {
            VerifyTarget::Manifest { work_dir, manifest } => {
                let layout = WorkLayout::new(work_dir);
                let manifest = Self::load_manifest(&layout, manifest.as_deref())?;
                let verifier = Verifier::new(&manifest.project.source_language, &manifest.project.target_language);

                let progress_bar = Self::progress_bar("documents");
                let report = verifier.verify_manifest_with_progress(&manifest, &layout, |done, total| {
                    progress_bar.set_length(total as u64);
                    progress_bar.set_position(done as u64);
                });
                progress_bar.finish_and_clear();
                (report, Some(layout))
            }
            VerifyTarget::Directory(dir) => {
                let verifier = Verifier::new(&self.config.source_language, &self.config.target_language);
                (verifier.verify_tree(dir), None)
            }
        };

        if let Some(path) = output_report {
            report
                .save(path)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }

        if let Some(layout) = layout {
            let summary = PhaseSummary {
                phase: "verify".to_string(),
                processed: report.summary.passed_documents,
                skipped: 0,
                failed: report.summary.total_documents - report.summary.passed_documents,
            };
            self.log_summary(&layout, &summary, start_time.elapsed());
        }

        Ok(report)
    }

    /// Observed task progress for a manifest
    pub fn status(&self, work_dir: &Path, manifest_path: Option<&Path>) -> Result<Progress> {
        let layout = WorkLayout::new(work_dir);
        let manifest = Self::load_manifest(&layout, manifest_path)?;
        Ok(manifest.progress())
    }

    fn load_manifest(layout: &WorkLayout, manifest_path: Option<&Path>) -> Result<Manifest> {
        if !FileManager::dir_exists(layout.work_dir()) {
            return Err(ConfigurationError(format!(
                "work directory not found: {}",
                layout.work_dir().display()
            ))
            .into());
        }

        let path = manifest_path.map(Path::to_path_buf).unwrap_or_else(|| layout.manifest_path());
        Ok(Manifest::load(&path)?)
    }

    fn progress_bar(unit: &str) -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%)",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar
    }

    fn log_summary(&self, layout: &WorkLayout, summary: &PhaseSummary, duration: Duration) {
        let line = format!("{} - Duration: {}", summary, Self::format_duration(duration));
        info!("{}", line);

        if let Err(e) = FileManager::append_to_log_file(layout.log_file(), &line) {
            warn!("Failed to write pipeline log: {}", e);
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
