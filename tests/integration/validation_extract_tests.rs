/*!
 * Tests for review chunk extraction from a translated tree
 */

use anyhow::Result;
use std::fs;

use manuscript::app_config::Config;
use manuscript::app_controller::Controller;
use manuscript::batching::ValidationManifest;
use manuscript::errors::ConfigurationError;
use crate::common;

fn translated_tree(dir: &std::path::Path) -> Result<()> {
    common::create_test_file(
        dir,
        "Text/ch01.xhtml",
        &common::xhtml_document("one", &common::paragraphs("첫 번째 장의 문단입니다", 40)),
    )?;
    common::create_test_file(
        dir,
        "Text/ch02.xhtml",
        &common::xhtml_document("two", &common::paragraphs("두 번째 장의 문단입니다", 40)),
    )?;
    common::create_test_file(dir, "page3.json", r#"{"text": "페이지 세 번째 본문"}"#)?;
    common::create_test_file(dir, "table4.json", r#"{"data": [["열 하나", "열 둘"], ["값", 3]]}"#)?;
    common::create_test_file(dir, "empty.json", r#"{"text": "   "}"#)?;
    Ok(())
}

/// Files are packed in path order under the token budget
#[test]
fn test_extract_validation_withSmallBudget_shouldWriteSeveralChunks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    translated_tree(dir.path())?;

    let mut config = Config::default();
    config.packing.max_tokens = 500;
    let controller = Controller::with_config(config)?;

    let manifest = controller.extract_validation(dir.path(), output.path())?;

    assert!(manifest.total_chunks >= 2);
    assert_eq!(manifest.total_chunks, manifest.validation_tasks.len());

    let included: Vec<String> = manifest
        .validation_tasks
        .iter()
        .flat_map(|t| t.files_included.clone())
        .collect();
    assert_eq!(
        included,
        vec!["Text/ch01.xhtml", "Text/ch02.xhtml", "page3.json", "table4.json"]
    );

    let first = &manifest.validation_tasks[0];
    assert_eq!(first.task_id, "validate_001");
    assert_eq!(first.input_file, output.path().join("validate_001_input.txt"));
    assert_eq!(first.output_file, output.path().join("validate_001_result.json"));
    assert_eq!(first.status_file, output.path().join("validate_001.status"));

    let text = fs::read_to_string(&first.input_file)?;
    assert!(text.starts_with("[FILE: Text/ch01.xhtml]\n<paragraphs>\n1: 첫 번째 장의 문단입니다 1"));
    assert!(text.contains("</paragraphs>"));

    let saved: ValidationManifest =
        serde_json::from_str(&fs::read_to_string(output.path().join("validation_manifest.json"))?)?;
    assert_eq!(saved, manifest);
    assert!(manifest.skipped_files.is_empty());

    Ok(())
}

/// With the default budget everything fits in one chunk
#[test]
fn test_extract_validation_withDefaultBudget_shouldWriteOneChunk() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    translated_tree(dir.path())?;

    let manifest = Controller::new_for_test()?.extract_validation(dir.path(), output.path())?;

    assert_eq!(manifest.total_chunks, 1);
    let text = fs::read_to_string(&manifest.validation_tasks[0].input_file)?;
    assert!(text.contains("[FILE: table4.json]\n<paragraphs>\n1: 열 하나 | 열 둘\n값 | 3"));
    assert!(!text.contains("empty.json"));

    Ok(())
}

/// Long paragraphs are truncated in the review input
#[test]
fn test_extract_validation_withLongParagraph_shouldTruncate() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    let long = format!("<p>{}</p>", "가".repeat(50));
    common::create_test_file(dir.path(), "long.xhtml", &common::xhtml_document("t", &[long]))?;

    let mut config = Config::default();
    config.packing.max_paragraph_chars = 10;
    let manifest = Controller::with_config(config)?.extract_validation(dir.path(), output.path())?;

    let text = fs::read_to_string(&manifest.validation_tasks[0].input_file)?;
    assert!(text.contains(&format!("1: {}...", "가".repeat(10))));

    Ok(())
}

/// Unparseable records and undecodable files are reported; the rest is still chunked
#[test]
fn test_extract_validation_withBrokenFiles_shouldSkipThemAndContinue() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_file(
        dir.path(),
        "a.xhtml",
        &common::xhtml_document("a", &common::paragraphs("정상적인 문단입니다", 2)),
    )?;
    common::create_test_file(dir.path(), "broken.json", "{not json")?;
    fs::write(dir.path().join("latin1.xhtml"), [0x3c, 0x70, 0x3e, 0xe9, 0xff, 0x3c, 0x2f, 0x70, 0x3e])?;

    let manifest = Controller::new_for_test()?.extract_validation(dir.path(), output.path())?;

    assert_eq!(manifest.total_chunks, 1);
    assert_eq!(manifest.validation_tasks[0].files_included, vec!["a.xhtml"]);
    let skipped: Vec<&str> = manifest.skipped_files.iter().map(|i| i.subject.as_str()).collect();
    assert_eq!(skipped, vec!["broken.json", "latin1.xhtml"]);
    assert!(manifest.skipped_files[0].error.contains("Invalid unit record"));

    let saved: ValidationManifest =
        serde_json::from_str(&fs::read_to_string(output.path().join("validation_manifest.json"))?)?;
    assert_eq!(saved.skipped_files, manifest.skipped_files);

    Ok(())
}

/// A missing directory is a configuration error and nothing is written
#[test]
fn test_extract_validation_withMissingDirectory_shouldFail() -> Result<()> {
    let output = common::create_temp_dir()?;
    let missing = output.path().join("missing");

    let err = Controller::new_for_test()?
        .extract_validation(&missing, &output.path().join("chunks"))
        .unwrap_err();

    assert!(err.downcast_ref::<ConfigurationError>().is_some());
    assert!(!output.path().join("chunks").exists());

    Ok(())
}
