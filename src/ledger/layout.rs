use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

// @module: Work directory layout

static NON_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w-]").unwrap());

/// Maximum length of a document id
pub const MAX_DOCUMENT_ID_CHARS: usize = 50;

/// Replace every non-word character with `_`
pub fn sanitize_id(raw: &str) -> String {
    NON_WORD_REGEX.replace_all(raw, "_").into_owned()
}

/// Document id derived from a volume directory name
pub fn document_id_for(name: &str) -> String {
    sanitize_id(name).chars().take(MAX_DOCUMENT_ID_CHARS).collect()
}

/// File key for a relative path: extension dropped, non-word characters replaced
pub fn file_key_for(relative: &str) -> String {
    let without_ext = match relative.rfind('.') {
        Some(dot) if !relative[dot..].contains('/') => &relative[..dot],
        _ => relative,
    };
    sanitize_id(without_ext)
}

/// First 8 hex digits of the SHA-256 of `value`
pub fn short_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

// @struct: Deterministic paths under the work directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLayout {
    work_dir: PathBuf,
}

impl WorkLayout {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join("manifest.json")
    }

    pub fn sections_dir(&self, document_id: &str) -> PathBuf {
        self.work_dir.join("sections").join(document_id)
    }

    pub fn translated_dir(&self, document_id: &str) -> PathBuf {
        self.work_dir.join("translated").join(document_id)
    }

    pub fn status_dir(&self) -> PathBuf {
        self.work_dir.join("status")
    }

    pub fn validation_dir(&self) -> PathBuf {
        self.work_dir.join("validation")
    }

    pub fn log_file(&self) -> PathBuf {
        self.work_dir.join("logs").join("pipeline.log")
    }

    // @returns: Fragment input file for section `index`
    pub fn fragment_input(&self, document_id: &str, file_key: &str, index: usize, extension: &str) -> PathBuf {
        self.sections_dir(document_id)
            .join("input")
            .join(format!("{}_part{}.{}", file_key, index, extension))
    }

    // @returns: Where the worker writes the translated fragment
    // Inputs and outputs live in sibling directories so no file key can map
    // one task's input onto another task's output.
    pub fn fragment_output(&self, document_id: &str, file_key: &str, index: usize, extension: &str) -> PathBuf {
        self.sections_dir(document_id)
            .join("output")
            .join(format!("{}_part{}.{}", file_key, index, extension))
    }

    /// Output of a whole-document or unit task, and target of merged fragments
    pub fn translated_path(&self, document_id: &str, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.translated_dir(document_id), |path, part| path.join(part))
    }

    pub fn status_path(&self, task_id: &str) -> PathBuf {
        self.status_dir().join(format!("{}.status", task_id))
    }
}
