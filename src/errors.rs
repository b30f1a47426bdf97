/*!
 * Error types for the manuscript pipeline.
 *
 * Per-document and per-task failures are values that phases collect into
 * their reports. Only `ConfigurationError` is expected to abort a run.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Which part of a document's wrapper could not be located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureErrorKind {
    /// No content-container start marker (`<body>`)
    MissingOpening,

    /// No matching content-container end marker (`</body>`)
    MissingClosing,

    /// The markup itself could not be read by the structural parser
    Malformed {
        /// Byte offset reported by the parser
        position: usize,
        /// Parser message
        message: String,
    },
}

/// A document's wrapper boundaries are unrecognizable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Structure error in {document}: {}", describe_structure(.kind))]
pub struct StructureError {
    /// Document (or fragment output) that failed to parse
    pub document: String,
    /// What went wrong
    pub kind: StructureErrorKind,
}

impl StructureError {
    pub fn missing_opening(document: impl Into<String>) -> Self {
        Self { document: document.into(), kind: StructureErrorKind::MissingOpening }
    }

    pub fn missing_closing(document: impl Into<String>) -> Self {
        Self { document: document.into(), kind: StructureErrorKind::MissingClosing }
    }

    pub fn malformed(document: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            kind: StructureErrorKind::Malformed { position, message: message.into() },
        }
    }
}

fn describe_structure(kind: &StructureErrorKind) -> String {
    match kind {
        StructureErrorKind::MissingOpening => "could not find <body> start tag".to_string(),
        StructureErrorKind::MissingClosing => "could not find </body> end tag".to_string(),
        StructureErrorKind::Malformed { position, message } => {
            format!("malformed markup at byte {}: {}", position, message)
        }
    }
}

/// A fragment group is incomplete, so its document cannot be merged
#[derive(Error, Debug, Clone)]
#[error("Missing {} translated section(s) for {document_id}/{parent_file}", .missing.len())]
pub struct MissingFragmentError {
    /// Manifest document the group belongs to
    pub document_id: String,
    /// Source file the fragments were cut from
    pub parent_file: String,
    /// Output paths that are absent or not completed
    pub missing: Vec<PathBuf>,
}

/// A worker output could not be parsed or lacks required fields
#[derive(Error, Debug, Clone)]
#[error("Malformed output {}: {reason}", .path.display())]
pub struct MalformedOutputError {
    /// Offending output file
    pub path: PathBuf,
    /// Why it was rejected
    pub reason: String,
}

/// The run cannot start: manifest or work directory absent, or invalid config
#[derive(Error, Debug, Clone)]
#[error("Configuration error: {0}")]
pub struct ConfigurationError(pub String);

/// Umbrella error for library operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Document structure could not be recognized
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Fragment group incomplete
    #[error(transparent)]
    MissingFragment(#[from] MissingFragmentError),

    /// Worker output unusable
    #[error(transparent)]
    MalformedOutput(#[from] MalformedOutputError),

    /// Fatal configuration problem
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Error from a file operation
    #[error("File error on {}: {source}", .path.display())]
    File {
        /// Path being read or written
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest or report (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure bubbled up from file utilities
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File { path: path.into(), source }
    }

    /// Whether this failure should abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
