use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::errors::ConfigurationError;
use crate::file_utils::FileManager;

/// Pipeline configuration module
/// This module handles loading, validating and saving the settings every
/// phase receives explicitly (no process-wide defaults are consulted).
/// Represents the pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Structural splitting settings
    #[serde(default)]
    pub split: SplitConfig,

    /// Token-budget packing settings
    #[serde(default)]
    pub packing: PackingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where the declaration/doctype prologue goes when a document is split
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProloguePolicy {
    /// Every fragment is a standalone document carrying the prologue
    #[default]
    EveryFragment,
    /// Only fragment 1 carries it; fragments are reassembled in order
    FirstOnly,
}

/// Settings for the structural splitter
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SplitConfig {
    /// Files at or above this size (KB) are split
    #[serde(default = "default_split_threshold_kb")]
    pub threshold_kb: f64,

    /// Number of fragments a large file is cut into
    #[serde(default = "default_split_parts")]
    pub parts: usize,

    /// Prologue placement, applied by both splitter and merger
    #[serde(default)]
    pub prologue_policy: ProloguePolicy,

    /// Estimated token budget per section when splitting markdown
    #[serde(default = "default_markdown_max_tokens")]
    pub markdown_max_tokens: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            threshold_kb: default_split_threshold_kb(),
            parts: default_split_parts(),
            prologue_policy: ProloguePolicy::default(),
            markdown_max_tokens: default_markdown_max_tokens(),
        }
    }
}

/// Settings for the token-budget packer and validation extraction
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PackingConfig {
    /// Estimated token budget per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Paragraphs longer than this are truncated in review input
    #[serde(default = "default_max_paragraph_chars")]
    pub max_paragraph_chars: usize,

    /// Paragraphs this short or shorter are not extracted
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_paragraph_chars: default_max_paragraph_chars(),
            min_paragraph_chars: default_min_paragraph_chars(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "ja".to_string()
}

fn default_target_language() -> String {
    "ko".to_string()
}

fn default_split_threshold_kb() -> f64 {
    30.0
}

fn default_split_parts() -> usize {
    4
}

fn default_markdown_max_tokens() -> usize {
    6000
}

fn default_max_tokens() -> usize {
    8000
}

fn default_max_paragraph_chars() -> usize {
    500
}

fn default_min_paragraph_chars() -> usize {
    5
}

impl Config {
    /// Load a configuration file, or write and return the defaults when absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(path, &config_json)?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        crate::language_utils::get_language_name(&self.source_language)
            .map_err(|e| ConfigurationError(format!("source language: {}", e)))?;
        crate::language_utils::get_language_name(&self.target_language)
            .map_err(|e| ConfigurationError(format!("target language: {}", e)))?;

        if self.split.parts == 0 {
            return Err(ConfigurationError("split.parts must be at least 1".to_string()));
        }
        if self.split.threshold_kb.is_nan() || self.split.threshold_kb <= 0.0 {
            return Err(ConfigurationError("split.threshold_kb must be positive".to_string()));
        }
        if self.split.markdown_max_tokens == 0 {
            return Err(ConfigurationError("split.markdown_max_tokens must be at least 1".to_string()));
        }
        if self.packing.max_tokens == 0 {
            return Err(ConfigurationError("packing.max_tokens must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            split: SplitConfig::default(),
            packing: PackingConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
