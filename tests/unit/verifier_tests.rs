/*!
 * Tests for translated-output verification
 */

use anyhow::Result;
use std::fs;

use manuscript::app_config::Config;
use manuscript::ledger::{Analyzer, StatusBoard, TaskType, WorkLayout};
use manuscript::validation::Verifier;
use manuscript::validation::verifier::{FileKind, check_layout};
use crate::common;

/// Five hiragana characters in a Japanese-to-Korean output fail the file
#[test]
fn test_verify_tree_withResidualHiragana_shouldReportFiveSourceCharacters() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(
        dir.path(),
        "ch01.xhtml",
        &common::xhtml_document("t", &["<p>あいうえお</p>".to_string()]),
    )?;

    let report = Verifier::new("ja", "ko").verify_tree(dir.path());

    assert_eq!(report.summary.total_files, 1);
    assert_eq!(report.summary.total_source_chars, 5);
    assert_eq!(report.summary.files_with_issues, 1);
    assert!(!report.summary.passed);

    let file = &report.documents[0].files[0];
    assert_eq!(file.file, "ch01.xhtml");
    assert_eq!(file.source_chars.by_range["hiragana"], 5);
    assert!(!file.passed);

    Ok(())
}

/// Hangul-only output passes
#[test]
fn test_verify_tree_withHangulOnly_shouldPass() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(
        dir.path(),
        "Text/ch01.xhtml",
        &common::xhtml_document("t", &["<p>안녕하세요</p>".to_string()]),
    )?;
    common::create_test_file(dir.path(), "page1.json", r#"{"text": "번역된 본문입니다"}"#)?;

    let report = Verifier::new("ja", "ko").verify_tree(dir.path());

    assert!(report.summary.passed);
    assert_eq!(report.summary.passed_documents, 1);
    assert_eq!(report.summary.total_source_chars, 0);
    let kinds: Vec<FileKind> = report.documents[0].files.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FileKind::Markup, FileKind::Record]);
    assert!(report.documents[0].files.iter().all(|f| f.has_target_marker));

    Ok(())
}

/// A translated metadata record planned by analysis is a valid output
#[test]
fn test_verify_manifest_withTranslatedMetadataRecord_shouldPass() -> Result<()> {
    let source = common::create_temp_dir()?;
    let work = common::create_temp_dir()?;
    common::create_test_file(&source.path().join("vol"), "metadata.json", r#"{"title": "題名"}"#)?;

    let manifest = Analyzer::new(Config::default()).analyze(source.path(), work.path())?.manifest;
    let task = manifest.tasks().next().expect("metadata task");
    assert_eq!(task.task_type, TaskType::Metadata);
    StatusBoard::publish_output(task, r#"{"title": "제목", "author": "저자"}"#)?;

    let report = Verifier::new("ja", "ko").verify_manifest(&manifest, &WorkLayout::new(work.path()));

    assert!(report.summary.passed, "{:?}", report.documents);
    let file = &report.documents[0].files[0];
    assert_eq!(file.kind, FileKind::Record);
    assert!(file.well_formed);
    assert!(file.has_target_marker);

    Ok(())
}

/// A record with none of the recognized fields is malformed
#[test]
fn test_verify_record_withUnrecognizedFields_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "page1.json", r#"{"body": "번역"}"#)?;

    let report = Verifier::new("ja", "ko").verify_tree(dir.path());

    let file = &report.documents[0].files[0];
    assert!(!file.well_formed);
    assert!(!file.passed);

    Ok(())
}

/// An unclosed element makes the file fail well-formedness
#[test]
fn test_verify_markup_withUnbalancedTags_shouldNotBeWellFormed() {
    let verifier = Verifier::new("ja", "ko");
    let report = verifier.verify_markup("bad.xhtml", "<html lang=\"ko\"><body><p>문장</p>");

    assert!(!report.well_formed);
    assert!(!report.passed);
    assert!(report.has_target_marker);
}

/// Missing language marker is a warning only
#[test]
fn test_verify_markup_withoutMarker_shouldWarnButPass() {
    let verifier = Verifier::new("ja", "ko");
    let report = verifier.verify_markup("a.xhtml", "<html><body><p>문장</p></body></html>");

    assert!(report.passed);
    assert!(!report.has_target_marker);
    assert_eq!(report.warnings.len(), 1);
}

/// Table records are checked through their flattened rows
#[test]
fn test_verify_record_withUntranslatedTable_shouldFail() {
    let verifier = Verifier::new("ja", "ko");
    let report = verifier.verify_record(
        "table1.json",
        std::path::Path::new("table1.json"),
        r#"{"data": [["名前", "값"], ["이름", null]]}"#,
    );

    assert_eq!(report.source_chars.total, 2);
    assert!(!report.passed);
}

#[test]
fn test_verify_record_withInvalidJson_shouldBeMalformed() {
    let verifier = Verifier::new("ja", "ko");
    let report = verifier.verify_record("x.json", std::path::Path::new("x.json"), "{oops");

    assert!(!report.well_formed);
    assert!(!report.passed);
}

/// Vertical writing mode and right-to-left page progression are layout issues
#[test]
fn test_check_layout_withVerticalStyles_shouldReportEachIssue() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(
        dir.path(),
        "Styles/style.css",
        "body { writing-mode: vertical-rl; }\n.h { -epub-writing-mode: horizontal-tb; }",
    )?;
    common::create_test_file(
        dir.path(),
        "content.opf",
        &common::package_opf("t").replace("\"ltr\"", "\"rtl\""),
    )?;

    let issues = check_layout(dir.path());

    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].subject, "Styles/style.css");
    assert!(issues[0].error.contains("vertical-rl"));
    assert!(issues[1].error.contains("rtl"));

    Ok(())
}

/// Layout problems fail the document when translating from Japanese only
#[test]
fn test_verify_tree_withLayoutIssues_shouldDependOnSourceLanguage() -> Result<()> {
    let dir = common::create_temp_dir()?;
    common::create_test_file(dir.path(), "style.css", "html { writing-mode: vertical-rl }")?;

    let japanese = Verifier::new("ja", "ko").verify_tree(dir.path());
    assert_eq!(japanese.documents[0].layout_issues.len(), 1);
    assert!(!japanese.summary.passed);

    let chinese = Verifier::new("zh", "ko").verify_tree(dir.path());
    assert!(chinese.documents[0].layout_issues.is_empty());
    assert!(chinese.summary.passed);

    Ok(())
}

/// A missing translated directory fails its document
#[test]
fn test_verify_tree_withMissingDirectory_shouldFailDocument() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let report = Verifier::new("ja", "ko").verify_tree(&dir.path().join("translated"));

    assert!(!report.summary.passed);
    assert_eq!(report.documents[0].document_id, "translated");
    assert_eq!(report.documents[0].errors.len(), 1);

    Ok(())
}

/// Verification never modifies the tree and saves a JSON report
#[test]
fn test_verify_tree_runTwice_shouldNotModifyTree() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        dir.path(),
        "ch.xhtml",
        &common::xhtml_document("t", &["<p>カタカナ</p>".to_string()]),
    )?;
    let before = fs::read_to_string(&path)?;

    let verifier = Verifier::new("ja", "ko");
    let first = verifier.verify_tree(dir.path());
    let second = verifier.verify_tree(dir.path());

    assert_eq!(fs::read_to_string(&path)?, before);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.summary.total_source_chars, 4);

    let report_dir = common::create_temp_dir()?;
    let report_path = report_dir.path().join("report.json");
    first.save(&report_path)?;
    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(saved["summary"]["total_source_chars"], 4);
    assert_eq!(saved["documents"][0]["files"][0]["source_chars"]["by_range"]["katakana"], 4);

    Ok(())
}
