/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use manuscript::app_config::{Config, LogLevel, ProloguePolicy};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "ja");
    assert_eq!(config.target_language, "ko");
    assert_eq!(config.split.threshold_kb, 30.0);
    assert_eq!(config.split.parts, 4);
    assert_eq!(config.split.prologue_policy, ProloguePolicy::EveryFragment);
    assert_eq!(config.packing.max_tokens, 8000);
    assert_eq!(config.packing.max_paragraph_chars, 500);
    assert_eq!(config.packing.min_paragraph_chars, 5);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "jpn".to_string();
    assert!(config.validate().is_ok());

    config.split.parts = 0;
    assert!(config.validate().is_err());
    config.split.parts = 1;

    config.split.threshold_kb = 0.0;
    assert!(config.validate().is_err());
    config.split.threshold_kb = f64::NAN;
    assert!(config.validate().is_err());
    config.split.threshold_kb = 10.0;

    config.packing.max_tokens = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("max_tokens"));
}

/// Partial files fill missing fields from defaults
#[test]
fn test_deserialize_withPartialJson_shouldUseDefaults() -> Result<()> {
    let config: Config = serde_json::from_str(
        r#"{"target_language": "en", "split": {"parts": 8, "prologue_policy": "first_only"}}"#,
    )?;

    assert_eq!(config.source_language, "ja");
    assert_eq!(config.target_language, "en");
    assert_eq!(config.split.parts, 8);
    assert_eq!(config.split.threshold_kb, 30.0);
    assert_eq!(config.split.prologue_policy, ProloguePolicy::FirstOnly);
    assert_eq!(config.packing.max_tokens, 8000);

    Ok(())
}

/// A missing config file is created with defaults
#[test]
fn test_load_or_default_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_default(&path)?;
    assert_eq!(config, Config::default());
    assert!(path.exists());

    let reloaded = Config::load_or_default(&path)?;
    assert_eq!(reloaded, config);

    Ok(())
}

/// Log levels map onto log filters
#[test]
fn test_log_level_toLevelFilter_shouldMatch() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
