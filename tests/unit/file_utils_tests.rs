/*!
 * Tests for file utility functions
 */

use std::fs;
use anyhow::Result;
use manuscript::file_utils::{FileManager, round2};
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.tmp")));

    Ok(())
}

/// Test that dir_exists returns false for non-existent directories
#[test]
fn test_dir_exists_withNonExistentDir_shouldReturnFalse() {
    assert!(!FileManager::dir_exists("./non_existent_directory_12345"));
}

/// find_files matches extensions case-insensitively and sorts by path
#[test]
fn test_find_files_withMixedExtensions_shouldReturnSortedMatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "b/ch02.XHTML", "x")?;
    common::create_test_file(temp_dir.path(), "a/ch01.xhtml", "x")?;
    common::create_test_file(temp_dir.path(), "a/style.css", "x")?;
    common::create_test_file(temp_dir.path(), "page1.json", "{}")?;

    let files = FileManager::find_files(temp_dir.path(), &["xhtml", ".json"])?;
    let names: Vec<String> = files
        .iter()
        .map(|p| FileManager::relative_path(p, temp_dir.path()))
        .collect::<Result<_>>()?;

    assert_eq!(names, vec!["a/ch01.xhtml", "b/ch02.XHTML", "page1.json"]);

    Ok(())
}

/// relative_path fails for paths outside the base
#[test]
fn test_relative_path_withForeignPath_shouldFail() {
    let result = FileManager::relative_path(std::path::Path::new("/a/b"), std::path::Path::new("/c"));
    assert!(result.is_err());
}

/// write_atomic replaces content and leaves no temporary files behind
#[test]
fn test_write_atomic_withExistingFile_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("file.txt");

    FileManager::write_atomic(&path, "first")?;
    FileManager::write_atomic(&path, "second")?;

    assert_eq!(fs::read_to_string(&path)?, "second");
    assert_eq!(fs::read_dir(path.parent().unwrap())?.count(), 1);

    Ok(())
}

/// append_to_log_file adds timestamped lines
#[test]
fn test_append_to_log_file_shouldAppendLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log = temp_dir.path().join("logs").join("pipeline.log");

    FileManager::append_to_log_file(&log, "one")?;
    FileManager::append_to_log_file(&log, "two")?;

    let content = fs::read_to_string(&log)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("one"));

    Ok(())
}

#[test]
fn test_file_size_kb_shouldRoundToTwoDecimals() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "f.txt", &"x".repeat(1500))?;

    assert_eq!(FileManager::file_size_kb(&path)?, 1.46);
    assert_eq!(round2(1.005_1), 1.01);

    Ok(())
}
