/*!
 * Read-only audit of translated output.
 *
 * For each file the verifier counts residual source-script characters,
 * checks markup well-formedness (or unit-record shape) and looks for a
 * target-language marker. Volumes translated from Japanese additionally get
 * their stylesheet writing mode and package page direction checked.
 *
 * Verification never writes to the tree it inspects and can be re-run at any
 * time with the same result.
 */

use anyhow::Result;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::batching::extract::record_text;
use crate::document::markup::check_well_formed;
use crate::errors::MalformedOutputError;
use crate::file_utils::FileManager;
use crate::language_utils::{self, ScriptCounts};
use crate::document::markdown;
use crate::ledger::analysis::{RECORD_EXTENSION, record_task_type, translatable_extensions};
use crate::ledger::layout::WorkLayout;
use crate::ledger::models::Manifest;
use crate::report::Issue;

static WRITING_MODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"writing-mode\s*:\s*([^;}]+)").unwrap());
static PAGE_DIRECTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"page-progression-direction\s*=\s*["']([^"']+)["']"#).unwrap());

/// Records and markdown shorter than this are not expected to contain target script
const MIN_CHARS_FOR_SCRIPT_CHECK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Markup,
    Markdown,
    Record,
}

/// Findings for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub kind: FileKind,
    pub source_chars: ScriptCounts,
    pub well_formed: bool,
    pub has_target_marker: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub passed: bool,
}

impl FileReport {
    fn new(file: &str, kind: FileKind) -> Self {
        Self {
            file: file.to_string(),
            kind,
            source_chars: ScriptCounts::default(),
            well_formed: true,
            has_target_marker: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            passed: true,
        }
    }

    fn fail(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.passed = false;
    }
}

/// Findings for one document (volume) directory
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub document_id: String,
    pub directory: PathBuf,
    pub files: Vec<FileReport>,
    pub layout_issues: Vec<Issue>,
    pub errors: Vec<String>,
    pub total_source_chars: usize,
    pub passed: bool,
}

impl DocumentReport {
    pub fn files_with_issues(&self) -> usize {
        self.files.iter().filter(|f| !f.passed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub total_documents: usize,
    pub passed_documents: usize,
    pub total_files: usize,
    pub files_with_issues: usize,
    pub total_source_chars: usize,
    pub passed: bool,
}

/// Project-level verification result
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub source_language: String,
    pub target_language: String,
    pub documents: Vec<DocumentReport>,
    pub summary: VerificationSummary,
}

impl VerificationReport {
    fn from_documents(source: &str, target: &str, documents: Vec<DocumentReport>) -> Self {
        let summary = VerificationSummary {
            total_documents: documents.len(),
            passed_documents: documents.iter().filter(|d| d.passed).count(),
            total_files: documents.iter().map(|d| d.files.len()).sum(),
            files_with_issues: documents.iter().map(DocumentReport::files_with_issues).sum(),
            total_source_chars: documents.iter().map(|d| d.total_source_chars).sum(),
            passed: documents.iter().all(|d| d.passed),
        };

        Self {
            source_language: source.to_string(),
            target_language: target.to_string(),
            documents,
            summary,
        }
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        FileManager::write_atomic(path, &json)
    }
}

pub struct Verifier {
    source_language: String,
    target_language: String,
    marker: Option<Regex>,
}

impl Verifier {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        let mut codes = vec![target_language.trim().to_string()];
        if let Ok(normalized) = language_utils::normalize_to_part1_or_part2t(target_language) {
            if !codes.contains(&normalized) {
                codes.push(normalized);
            }
        }
        let alternatives: Vec<String> = codes.iter().map(|c| regex::escape(c)).collect();
        let marker = Regex::new(&format!(
            r#"\blang\s*=\s*["'](?i:{})["']"#,
            alternatives.join("|")
        ))
        .ok();

        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            marker,
        }
    }

    fn source_is_japanese(&self) -> bool {
        language_utils::language_codes_match(&self.source_language, "ja")
    }

    fn languages_differ(&self) -> bool {
        !language_utils::language_codes_match(&self.source_language, &self.target_language)
    }

    /// Audit one markup document
    pub fn verify_markup(&self, name: &str, content: &str) -> FileReport {
        let mut report = FileReport::new(name, FileKind::Markup);

        report.source_chars = language_utils::count_script_chars(content, &self.source_language);
        if report.source_chars.total > 0 {
            report.fail(format!("{} residual source character(s)", report.source_chars.total));
        }

        if let Err(e) = check_well_formed(name, content) {
            report.well_formed = false;
            report.fail(e.to_string());
        }

        report.has_target_marker = self.marker.as_ref().is_some_and(|re| re.is_match(content));
        if !report.has_target_marker {
            report
                .warnings
                .push(format!("no lang=\"{}\" marker", self.target_language));
        }

        report
    }

    /// Audit one markdown document.
    ///
    /// Markdown has no structure to reject, so only residual source text
    /// fails it. A leftover section marker means an unmerged section output.
    pub fn verify_markdown(&self, name: &str, content: &str) -> FileReport {
        let mut report = FileReport::new(name, FileKind::Markdown);

        report.source_chars = language_utils::count_script_chars(content, &self.source_language);
        if report.source_chars.total > 0 {
            report.fail(format!("{} residual source character(s)", report.source_chars.total));
        }

        if markdown::has_section_marker(content) {
            report.warnings.push("section marker left in merged output".to_string());
        }

        let target_chars = language_utils::count_script_chars(content, &self.target_language);
        report.has_target_marker = target_chars.total > 0;
        if !report.has_target_marker
            && self.languages_differ()
            && !language_utils::script_ranges(&self.target_language).is_empty()
            && content.chars().count() > MIN_CHARS_FOR_SCRIPT_CHECK
        {
            report.warnings.push("no target language characters".to_string());
        }

        report
    }

    /// Audit one unit record (JSON)
    pub fn verify_record(&self, name: &str, path: &Path, content: &str) -> FileReport {
        let mut report = FileReport::new(name, FileKind::Record);

        let record: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                report.well_formed = false;
                report.fail(
                    MalformedOutputError {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                    .to_string(),
                );
                return report;
            }
        };

        if record_task_type(&record).is_none() {
            report.well_formed = false;
            report.fail(
                MalformedOutputError {
                    path: path.to_path_buf(),
                    reason: "record has no text, data or title".to_string(),
                }
                .to_string(),
            );
            return report;
        }

        let text = record_text(&record).unwrap_or_default();
        report.source_chars = language_utils::count_script_chars(&text, &self.source_language);
        if report.source_chars.total > 0 {
            report.fail(format!("{} residual source character(s)", report.source_chars.total));
        }

        let target_chars = language_utils::count_script_chars(&text, &self.target_language);
        report.has_target_marker = target_chars.total > 0;
        if !report.has_target_marker
            && self.languages_differ()
            && !language_utils::script_ranges(&self.target_language).is_empty()
            && text.chars().count() > MIN_CHARS_FOR_SCRIPT_CHECK
        {
            report.warnings.push("no target language characters".to_string());
        }

        report
    }

    /// Audit every translatable file under `dir`
    pub fn verify_directory(&self, document_id: &str, dir: &Path) -> DocumentReport {
        let mut document = DocumentReport {
            document_id: document_id.to_string(),
            directory: dir.to_path_buf(),
            files: Vec::new(),
            layout_issues: Vec::new(),
            errors: Vec::new(),
            total_source_chars: 0,
            passed: true,
        };

        if !FileManager::dir_exists(dir) {
            warn!("Translated directory missing for {}: {}", document_id, dir.display());
            document.errors.push(format!("directory not found: {}", dir.display()));
            document.passed = false;
            return document;
        }

        match FileManager::find_files(dir, &translatable_extensions()) {
            Ok(files) => {
                for path in files {
                    let report = self.verify_file(dir, &path);
                    debug!("{}: passed={}", report.file, report.passed);
                    document.files.push(report);
                }
            }
            Err(e) => document.errors.push(e.to_string()),
        }

        if self.source_is_japanese() {
            document.layout_issues = check_layout(dir);
        }

        document.total_source_chars = document.files.iter().map(|f| f.source_chars.total).sum();
        document.passed = document.errors.is_empty()
            && document.layout_issues.is_empty()
            && document.files.iter().all(|f| f.passed);

        document
    }

    fn verify_file(&self, root: &Path, path: &Path) -> FileReport {
        let name = FileManager::relative_path(path, root).unwrap_or_else(|_| path.display().to_string());
        let kind = if path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(RECORD_EXTENSION))
        {
            FileKind::Record
        } else if markdown::is_markdown(&name) {
            FileKind::Markdown
        } else {
            FileKind::Markup
        };

        match FileManager::read_to_string(path) {
            Ok(content) => match kind {
                FileKind::Record => self.verify_record(&name, path, &content),
                FileKind::Markdown => self.verify_markdown(&name, &content),
                FileKind::Markup => self.verify_markup(&name, &content),
            },
            Err(e) => {
                let mut report = FileReport::new(&name, kind);
                report.well_formed = false;
                report.fail(format!("read error: {:#}", e));
                report
            }
        }
    }

    /// Verify a single directory as one document
    pub fn verify_tree(&self, dir: &Path) -> VerificationReport {
        let document_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| dir.display().to_string());
        let document = self.verify_directory(&document_id, dir);

        self.finish(vec![document])
    }

    /// Verify `translated/<document_id>` for every manifest document
    pub fn verify_manifest(&self, manifest: &Manifest, layout: &WorkLayout) -> VerificationReport {
        self.verify_manifest_with_progress(manifest, layout, |_, _| {})
    }

    /// Same as [`Verifier::verify_manifest`], reporting `(done, total)` documents
    pub fn verify_manifest_with_progress(
        &self,
        manifest: &Manifest,
        layout: &WorkLayout,
        progress_callback: impl Fn(usize, usize),
    ) -> VerificationReport {
        let total = manifest.documents.len();
        let documents = manifest
            .documents
            .iter()
            .enumerate()
            .map(|(done, doc)| {
                info!("Verifying {}", doc.document_id);
                let report = self.verify_directory(&doc.document_id, &layout.translated_dir(&doc.document_id));
                progress_callback(done + 1, total);
                report
            })
            .collect();

        self.finish(documents)
    }

    fn finish(&self, documents: Vec<DocumentReport>) -> VerificationReport {
        VerificationReport::from_documents(&self.source_language, &self.target_language, documents)
    }
}

/// Stylesheets must lay text out horizontally and packages must progress left to right
pub fn check_layout(dir: &Path) -> Vec<Issue> {
    let mut issues = Vec::new();

    for css in FileManager::find_files(dir, &["css"]).unwrap_or_default() {
        let Ok(content) = FileManager::read_to_string(&css) else { continue };
        let name = FileManager::relative_path(&css, dir).unwrap_or_else(|_| css.display().to_string());
        for caps in WRITING_MODE_REGEX.captures_iter(&content) {
            let mode = caps[1].trim();
            if !(mode.contains("horizontal") || mode == "lr-tb") {
                issues.push(Issue::new(name.clone(), format!("writing-mode is {}", mode)));
            }
        }
    }

    for opf in FileManager::find_files(dir, &["opf"]).unwrap_or_default() {
        let Ok(content) = FileManager::read_to_string(&opf) else { continue };
        let name = FileManager::relative_path(&opf, dir).unwrap_or_else(|_| opf.display().to_string());
        if let Some(caps) = PAGE_DIRECTION_REGEX.captures(&content) {
            let direction = caps[1].trim();
            if direction != "ltr" {
                issues.push(Issue::new(name, format!("page-progression-direction is {}", direction)));
            }
        }
    }

    issues
}
