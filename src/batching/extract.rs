/*!
 * Text extraction for batched review.
 *
 * Translated files are reduced to a compact, numbered paragraph listing,
 * grouped into token-bounded chunks by the packer, and written out as one
 * input file per chunk plus a validation manifest that review agents consume.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::app_config::PackingConfig;
use crate::batching::packer::{Packer, TextUnit};
use crate::batching::tokens::estimate_tokens;
use crate::file_utils::FileManager;
use crate::document::markdown;
use crate::ledger::analysis::translatable_extensions;
use crate::report::Issue;

static PARAGRAPH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BLANK_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\r?\n").unwrap());
static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HEADING_MARK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+").unwrap());

/// Maximum number of bookmarks listed for a metadata record
const MAX_BOOKMARKS: usize = 10;

/// Numbered paragraphs extracted from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Path relative to the extraction root
    pub name: String,
    /// `(paragraph number, normalized text)`, numbering counts skipped paragraphs
    pub paragraphs: Vec<(usize, String)>,
}

impl ExtractedFile {
    fn joined_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One review task in the validation manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationTask {
    pub task_id: String,
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub status_file: PathBuf,
    pub files_included: Vec<String>,
    pub estimated_tokens: usize,
}

/// Handoff artifact for review agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationManifest {
    pub total_chunks: usize,
    pub validation_tasks: Vec<ValidationTask>,
    /// Files that could not be read or parsed and were left out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<Issue>,
}

/// Everything found under one extraction root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub files: Vec<ExtractedFile>,
    pub issues: Vec<Issue>,
}

/// Paragraph texts of a markup document.
///
/// Nested tags are stripped and whitespace collapsed. Paragraphs of at most
/// `min_chars` characters are dropped but still counted.
pub fn extract_paragraphs(content: &str, min_chars: usize) -> Vec<(usize, String)> {
    PARAGRAPH_REGEX
        .captures_iter(content)
        .enumerate()
        .filter_map(|(i, caps)| {
            let inner = caps.get(1).map_or("", |m| m.as_str());
            let stripped = TAG_REGEX.replace_all(inner, "");
            let text = WHITESPACE_REGEX.replace_all(&stripped, " ").trim().to_string();
            (text.chars().count() > min_chars).then_some((i + 1, text))
        })
        .collect()
}

/// Paragraph texts of a markdown document.
///
/// Paragraphs are blank-line separated blocks of the body. Comments are
/// removed and heading marks dropped; numbering counts skipped paragraphs.
pub fn extract_markdown_paragraphs(content: &str, min_chars: usize) -> Vec<(usize, String)> {
    let (_, body) = markdown::split_frontmatter(content);

    BLANK_LINE_REGEX
        .split(body)
        .filter(|block| !block.trim().is_empty())
        .enumerate()
        .filter_map(|(i, block)| {
            let without_comments = COMMENT_REGEX.replace_all(block, "");
            let without_marks = HEADING_MARK_REGEX.replace_all(&without_comments, "");
            let text = WHITESPACE_REGEX.replace_all(&without_marks, " ").trim().to_string();
            (text.chars().count() > min_chars).then_some((i + 1, text))
        })
        .collect()
}

/// Reviewable text of a unit record: `text`, table rows, or metadata lines
pub fn record_text(record: &Value) -> Option<String> {
    if let Some(text) = record.get("text") {
        return text.as_str().map(str::to_string);
    }

    if let Some(rows) = record.get("data").and_then(Value::as_array) {
        let lines: Vec<String> = rows
            .iter()
            .map(|row| match row.as_array() {
                Some(cells) => cells.iter().map(cell_text).collect::<Vec<_>>().join(" | "),
                None => cell_text(row),
            })
            .collect();
        return Some(lines.join("\n"));
    }

    if record.get("title").is_some() {
        let mut parts = Vec::new();
        if let Some(title) = record.get("title").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            parts.push(format!("Title: {}", title));
        }
        if let Some(author) = record.get("author").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            parts.push(format!("Author: {}", author));
        }
        if let Some(bookmarks) = record.get("bookmarks").and_then(Value::as_array).filter(|b| !b.is_empty()) {
            parts.push("Bookmarks:".to_string());
            for bookmark in bookmarks.iter().take(MAX_BOOKMARKS) {
                let title = bookmark.get("title").and_then(Value::as_str).unwrap_or("");
                parts.push(format!("  - {}", title));
            }
        }
        return Some(parts.join("\n"));
    }

    None
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render files in the compact review format
pub fn format_for_validation(files: &[&ExtractedFile], max_paragraph_chars: usize) -> String {
    let mut lines = Vec::new();

    for file in files.iter().filter(|f| !f.paragraphs.is_empty()) {
        lines.push(format!("[FILE: {}]", file.name));
        lines.push("<paragraphs>".to_string());
        for (number, text) in &file.paragraphs {
            if text.chars().count() > max_paragraph_chars {
                let truncated: String = text.chars().take(max_paragraph_chars).collect();
                lines.push(format!("{}: {}...", number, truncated));
            } else {
                lines.push(format!("{}: {}", number, text));
            }
        }
        lines.push("</paragraphs>".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Builds review chunks from a directory of translated files
pub struct Extractor {
    config: PackingConfig,
}

impl Extractor {
    pub fn new(config: PackingConfig) -> Self {
        Self { config }
    }

    /// Extract every markup file and unit record under `dir`, in path order.
    ///
    /// Files with nothing to review are left out. Unreadable files and invalid
    /// records become issues; the rest of the directory is still extracted.
    pub fn extract_directory(&self, dir: &Path) -> Result<Extraction> {
        let mut extraction = Extraction::default();
        for path in FileManager::find_files(dir, &translatable_extensions())? {
            let name = FileManager::relative_path(&path, dir)?;

            let paragraphs = match self.extract_file(&path, &name) {
                Ok(paragraphs) => paragraphs,
                Err(e) => {
                    warn!("Skipping {}: {:#}", name, e);
                    extraction.issues.push(Issue::new(name, format!("{:#}", e)));
                    continue;
                }
            };

            if paragraphs.is_empty() {
                debug!("Nothing to review in {}", name);
                continue;
            }
            extraction.files.push(ExtractedFile { name, paragraphs });
        }

        Ok(extraction)
    }

    fn extract_file(&self, path: &Path, name: &str) -> Result<Vec<(usize, String)>> {
        let content = FileManager::read_to_string(path)?;

        if name.to_lowercase().ends_with(".json") {
            let record: Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid unit record: {}", path.display()))?;
            Ok(record_text(&record)
                .filter(|text| !text.trim().is_empty())
                .map(|text| vec![(1, text)])
                .unwrap_or_default())
        } else if markdown::is_markdown(name) {
            Ok(extract_markdown_paragraphs(&content, self.config.min_paragraph_chars))
        } else {
            Ok(extract_paragraphs(&content, self.config.min_paragraph_chars))
        }
    }

    /// Pack the extracted files and write one input file per chunk plus
    /// `validation_manifest.json`
    pub fn write_chunks(&self, extraction: &Extraction, output_dir: &Path) -> Result<ValidationManifest> {
        FileManager::ensure_dir(output_dir)?;
        let files = &extraction.files;

        let by_name: HashMap<&str, &ExtractedFile> = files.iter().map(|f| (f.name.as_str(), f)).collect();
        let units = files
            .iter()
            .map(|f| TextUnit::new(f.name.clone(), f.joined_text()))
            .collect();
        let chunks = Packer::new(self.config.max_tokens).pack(units);

        let mut tasks = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let task_id = format!("validate_{:03}", chunk.index);
            let input_file = output_dir.join(format!("{}_input.txt", task_id));

            let included: Vec<&ExtractedFile> = chunk
                .units
                .iter()
                .filter_map(|unit| by_name.get(unit.name.as_str()).copied())
                .collect();
            let text = format_for_validation(&included, self.config.max_paragraph_chars);
            FileManager::write_atomic(&input_file, &text)?;

            tasks.push(ValidationTask {
                output_file: output_dir.join(format!("{}_result.json", task_id)),
                status_file: output_dir.join(format!("{}.status", task_id)),
                input_file,
                files_included: chunk.unit_names(),
                estimated_tokens: estimate_tokens(&text),
                task_id,
            });
        }

        let manifest = ValidationManifest {
            total_chunks: tasks.len(),
            validation_tasks: tasks,
            skipped_files: extraction.issues.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize validation manifest")?;
        FileManager::write_atomic(output_dir.join("validation_manifest.json"), &json)?;

        info!("Wrote {} validation chunk(s) to {}", manifest.total_chunks, output_dir.display());
        Ok(manifest)
    }
}
