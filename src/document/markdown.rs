/*!
 * Markdown documents extracted from paged sources.
 *
 * A markdown document decomposes into an optional `---` frontmatter block
 * (the prologue) and heading blocks (the content units): each block starts at
 * a level 1-4 ATX heading and runs to the next one. Text before the first
 * heading is a block of its own. Headings inside fenced code are ignored.
 *
 * Blocks are verbatim slices, so frontmatter followed by every block
 * reproduces the source exactly.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batching::packer::{Packer, TextUnit};
use crate::batching::tokens::estimate_tokens;
use crate::document::splitter::Fragment;
use crate::file_utils::FileManager;

static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,4}[ \t]+\S").unwrap());
static SECTION_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!-- Section \d+ of \d+ -->(?:\r?\n){0,2}").unwrap());

/// Extensions treated as markdown documents
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

const FRONTMATTER_DELIMITER: &str = "---";

/// True when `name` has a markdown extension
pub fn is_markdown(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| ext.to_string_lossy().eq_ignore_ascii_case(m)))
}

/// A markdown document decomposed into frontmatter and heading blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    pub name: String,
    /// `---` delimited block at the very start, delimiters included
    pub frontmatter: Option<String>,
    /// Heading blocks in document order
    pub blocks: Vec<String>,
}

impl MarkdownDocument {
    /// Decompose `content`. Never fails: any text is a valid markdown body.
    pub fn parse(name: &str, content: &str) -> Self {
        let (frontmatter, body) = split_frontmatter(content);

        let mut blocks = Vec::new();
        let mut block_start = 0;
        let mut offset = 0;
        let mut in_fence = false;

        for line in body.split_inclusive('\n') {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            } else if !in_fence && offset > block_start && HEADING_REGEX.is_match(line) {
                blocks.push(body[block_start..offset].to_string());
                block_start = offset;
            }
            offset += line.len();
        }
        if block_start < body.len() {
            blocks.push(body[block_start..].to_string());
        }

        Self {
            name: name.to_string(),
            frontmatter: frontmatter.map(str::to_string),
            blocks,
        }
    }

    /// Body text without the frontmatter
    pub fn body(&self) -> String {
        self.blocks.concat()
    }

    pub fn to_markdown(&self) -> String {
        render(self.frontmatter.as_deref(), &self.blocks)
    }
}

/// Frontmatter (delimiters included) and the rest of `content`
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    if !content.starts_with(FRONTMATTER_DELIMITER) {
        return (None, content);
    }
    let start = FRONTMATTER_DELIMITER.len();
    match content[start..].find(FRONTMATTER_DELIMITER) {
        Some(pos) => {
            let end = start + pos + FRONTMATTER_DELIMITER.len();
            (Some(&content[..end]), &content[end..])
        }
        None => (None, content),
    }
}

/// Frontmatter followed by blocks
pub fn render(frontmatter: Option<&str>, blocks: &[String]) -> String {
    let mut out = String::with_capacity(blocks.iter().map(String::len).sum::<usize>() + 64);
    if let Some(frontmatter) = frontmatter {
        out.push_str(frontmatter);
    }
    for block in blocks {
        out.push_str(block);
    }
    out
}

fn section_marker(index: usize, total: usize) -> String {
    format!("<!-- Section {} of {} -->\n\n", index, total)
}

/// Drop a leading `<!-- Section i of n -->` marker, if any
pub fn strip_section_marker(section: &str) -> &str {
    match SECTION_MARKER_REGEX.find(section) {
        Some(m) => &section[m.end()..],
        None => section,
    }
}

/// True when `content` still carries a section marker
pub fn has_section_marker(content: &str) -> bool {
    SECTION_MARKER_REGEX.is_match(content)
}

/// Concatenate ordered section contents; markers are removed
pub fn merge_sections(sections: &[String]) -> String {
    sections.iter().map(|s| strip_section_marker(s)).collect()
}

// @struct: Cuts markdown at heading boundaries under a token budget
#[derive(Debug, Clone, Copy)]
pub struct MarkdownSplitter {
    max_tokens: usize,
}

impl MarkdownSplitter {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Pack heading blocks greedily into sections of at most `max_tokens`.
    ///
    /// Section 1 carries the frontmatter. Every section starts with a
    /// `<!-- Section i of n -->` marker that merging removes again. A block
    /// larger than the budget becomes a section of its own.
    pub fn split(&self, document_id: &str, content: &str) -> Vec<Fragment> {
        let document = MarkdownDocument::parse(document_id, content);

        let units = document
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| TextUnit::new(format!("block{}", i + 1), block.clone()))
            .collect();
        let mut groups: Vec<Vec<String>> = Packer::new(self.max_tokens)
            .pack(units)
            .into_iter()
            .map(|chunk| chunk.units.into_iter().map(|unit| unit.text).collect())
            .collect();
        if groups.is_empty() {
            groups.push(Vec::new());
        }

        let total_sections = groups.len();
        debug!(
            "Splitting {} ({} heading blocks) into {} section(s)",
            document_id,
            document.blocks.len(),
            total_sections
        );

        groups
            .into_iter()
            .enumerate()
            .map(|(i, units)| {
                let section_index = i + 1;
                let frontmatter = if section_index == 1 { document.frontmatter.as_deref() } else { None };
                let content = format!(
                    "{}{}",
                    section_marker(section_index, total_sections),
                    render(frontmatter, &units)
                );
                Fragment {
                    parent_document_id: document_id.to_string(),
                    section_index,
                    total_sections,
                    units,
                    content,
                }
            })
            .collect()
    }
}

/// Index written next to standalone section files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionsManifest {
    pub source_file: PathBuf,
    pub total_tokens: usize,
    pub sections: usize,
    pub max_tokens: usize,
    pub files: Vec<String>,
}

/// Split the markdown file `input` into `section_NNN.md` files plus
/// `sections_manifest.json` under `output_dir`
pub fn write_sections(splitter: &MarkdownSplitter, input: &Path, output_dir: &Path) -> Result<SectionsManifest> {
    let content = FileManager::read_to_string(input)?;
    let name = input.display().to_string();
    let total_tokens = estimate_tokens(&MarkdownDocument::parse(&name, &content).body());

    let fragments = splitter.split(&name, &content);
    FileManager::ensure_dir(output_dir)?;

    let mut files = Vec::with_capacity(fragments.len());
    for fragment in &fragments {
        let file_name = format!("section_{:03}.md", fragment.section_index);
        FileManager::write_atomic(output_dir.join(&file_name), &fragment.content)?;
        debug!("{}: ~{} tokens", file_name, estimate_tokens(&fragment.units.concat()));
        files.push(file_name);
    }

    let manifest = SectionsManifest {
        source_file: input.to_path_buf(),
        total_tokens,
        sections: files.len(),
        max_tokens: splitter.max_tokens(),
        files,
    };
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize sections manifest")?;
    FileManager::write_atomic(output_dir.join("sections_manifest.json"), &json)?;

    info!("Split {} into {} section(s)", input.display(), manifest.sections);
    Ok(manifest)
}
