/*!
 * Tests for error types and conversions
 */

use std::path::PathBuf;
use manuscript::errors::{
    ConfigurationError, MalformedOutputError, MissingFragmentError, PipelineError, StructureError,
};

#[test]
fn test_structureError_missingOpening_shouldNameDocument() {
    let error = StructureError::missing_opening("OEBPS/ch01.xhtml");
    let display = format!("{}", error);
    assert!(display.contains("OEBPS/ch01.xhtml"));
    assert!(display.contains("<body>"));
}

#[test]
fn test_structureError_malformed_shouldIncludePosition() {
    let error = StructureError::malformed("doc", 42, "unexpected end tag");
    let display = format!("{}", error);
    assert!(display.contains("42"));
    assert!(display.contains("unexpected end tag"));
}

#[test]
fn test_missingFragmentError_shouldCountMissingOutputs() {
    let error = MissingFragmentError {
        document_id: "vol1".to_string(),
        parent_file: "ch01.xhtml".to_string(),
        missing: vec![PathBuf::from("a"), PathBuf::from("b")],
    };
    let display = format!("{}", error);
    assert!(display.contains("Missing 2"));
    assert!(display.contains("vol1/ch01.xhtml"));
}

#[test]
fn test_pipelineError_fromVariants_shouldOnlyTreatConfigurationAsFatal() {
    let config: PipelineError = ConfigurationError("manifest not found".to_string()).into();
    assert!(config.is_fatal());
    assert!(config.to_string().contains("manifest not found"));

    let structure: PipelineError = StructureError::missing_closing("doc").into();
    assert!(!structure.is_fatal());

    let malformed: PipelineError = MalformedOutputError {
        path: PathBuf::from("out.json"),
        reason: "missing text".to_string(),
    }
    .into();
    assert!(!malformed.is_fatal());
    assert!(malformed.to_string().contains("out.json"));
}

#[test]
fn test_pipelineError_fileVariant_shouldKeepSource() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error = PipelineError::file("/tmp/x", io);
    assert!(error.to_string().contains("/tmp/x"));
    assert!(std::error::Error::source(&error).is_some());
}
