#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use manuscript::app_config::{self, Config};
use manuscript::app_controller::{Controller, VerifyTarget};
use manuscript::errors::{ConfigurationError, PipelineError};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plan tasks for every extracted volume under SOURCE and write the manifest
    Analyze {
        /// Directory of extracted volumes (or a single volume)
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Work directory for fragments, outputs and status files
        #[arg(short, long)]
        work_dir: PathBuf,

        /// Manifest path (default: <work-dir>/manifest.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Number of fragments a large file is split into
        #[arg(long)]
        split_parts: Option<usize>,

        /// Size in KB at or above which a file is split
        #[arg(long)]
        split_threshold: Option<f64>,
    },

    /// Reassemble translated fragments
    Merge {
        /// Work directory (manifest mode)
        #[arg(short, long, required_unless_present = "sections")]
        work_dir: Option<PathBuf>,

        /// Manifest path (default: <work-dir>/manifest.json)
        #[arg(short, long, conflicts_with = "sections")]
        manifest: Option<PathBuf>,

        /// Section outputs to merge, in order
        #[arg(long, num_args = 1.., requires = "output", conflicts_with = "work_dir")]
        sections: Vec<PathBuf>,

        /// Output file for --sections
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split a markdown file at heading boundaries into token-bounded sections
    SplitMarkdown {
        /// Markdown file to split
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for section_NNN.md files and sections_manifest.json
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Maximum estimated tokens per section
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Extract translated text into token-bounded review chunks
    Extract {
        /// Directory with translated files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for chunk inputs and validation_manifest.json
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Maximum estimated tokens per chunk
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Audit translated output for residual source text and broken markup
    Verify {
        /// Work directory (manifest mode)
        #[arg(short, long, required_unless_present = "volume_dir")]
        work_dir: Option<PathBuf>,

        /// Manifest path (default: <work-dir>/manifest.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Single directory to verify instead of the manifest documents
        #[arg(long, conflicts_with = "manifest")]
        volume_dir: Option<PathBuf>,

        /// Write the JSON report here
        #[arg(long)]
        output_report: Option<PathBuf>,
    },

    /// Show observed task progress
    Status {
        /// Work directory
        #[arg(short, long)]
        work_dir: PathBuf,

        /// Manifest path (default: <work-dir>/manifest.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Generate shell completions for manuscript
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// manuscript - document decomposition and recomposition for parallel translation
#[derive(Parser, Debug)]
#[command(name = "manuscript")]
#[command(version)]
#[command(about = "Split documents into translation tasks and reassemble the results")]
#[command(long_about = "manuscript cuts large markup documents into independently translatable
fragments, tracks every fragment as a task in a manifest, and later merges the
translated fragments back and audits the result.

EXAMPLES:
    manuscript analyze extracted/ -w work/         # Plan tasks and write work/manifest.json
    manuscript merge -w work/                      # Merge every complete fragment group
    manuscript merge --sections a.xhtml b.xhtml -o out.xhtml
    manuscript split-markdown -i source.md -o work/md_sections
    manuscript extract -d work/translated/vol1 -o work/validation
    manuscript verify -w work/ --output-report report.json
    manuscript status -w work/
    manuscript completions bash > manuscript.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file does not exist,
    a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Source language code (e.g. 'ja', 'zh', 'en')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g. 'ko', 'en')
    #[arg(short, long, global = true)]
    target_language: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> ExitCode {
    // Most verbose filter here; the effective level is set once config is known
    if CustomLogger::init(LevelFilter::Trace).is_err() {
        eprintln!("Failed to initialize logger");
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            let is_configuration = e.downcast_ref::<ConfigurationError>().is_some()
                || e.downcast_ref::<PipelineError>().is_some_and(PipelineError::is_fatal);
            if is_configuration {
                error!("{}", e);
            } else {
                error!("{:#}", e);
            }
            ExitCode::from(2)
        }
    }
}

/// Run one command; `Ok(false)` is a reported, failing outcome
fn run(cli: CommandLineOptions) -> Result<bool> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "manuscript", &mut std::io::stdout());
        return Ok(true);
    }

    let mut config = Config::load_or_default(&cli.config_path)?;
    if let Some(source_language) = cli.source_language {
        config.source_language = source_language;
    }
    if let Some(target_language) = cli.target_language {
        config.target_language = target_language;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }
    match &cli.command {
        Commands::Analyze { split_parts, split_threshold, .. } => {
            if let Some(parts) = split_parts {
                config.split.parts = *parts;
            }
            if let Some(threshold) = split_threshold {
                config.split.threshold_kb = *threshold;
            }
        }
        Commands::Extract { max_tokens: Some(max_tokens), .. } => config.packing.max_tokens = *max_tokens,
        Commands::SplitMarkdown { max_tokens: Some(max_tokens), .. } => {
            config.split.markdown_max_tokens = *max_tokens
        }
        _ => {}
    }
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Analyze { source, work_dir, manifest, .. } => {
            let report = controller.analyze(&source, &work_dir, manifest.as_deref())?;
            info!("{}", report.summary);
            Ok(report.is_clean())
        }
        Commands::Merge { work_dir, manifest, sections, output } => {
            if let Some(output) = output.filter(|_| !sections.is_empty()) {
                let merged = controller.merge_sections(&sections, &output)?;
                info!("Merged {} section(s) into {}", merged.sections, merged.output_path.display());
                return Ok(true);
            }
            let Some(work_dir) = work_dir else {
                return Err(ConfigurationError("merge needs --work-dir or --sections".to_string()).into());
            };

            let report = controller.merge(&work_dir, manifest.as_deref())?;
            info!("{}", report.summary);
            if !report.is_success() {
                warn!(
                    "{} group(s) incomplete, {} failed",
                    report.incomplete.len(),
                    report.failed.len()
                );
            }
            Ok(report.is_success())
        }
        Commands::SplitMarkdown { input, output_dir, .. } => {
            let manifest = controller.split_markdown(&input, &output_dir)?;
            info!(
                "{} section(s), ~{} tokens, written to {}",
                manifest.sections,
                manifest.total_tokens,
                output_dir.display()
            );
            Ok(true)
        }
        Commands::Extract { dir, output_dir, .. } => {
            let manifest = controller.extract_validation(&dir, &output_dir)?;
            info!("{} validation chunk(s) ready in {}", manifest.total_chunks, output_dir.display());
            for issue in &manifest.skipped_files {
                warn!("Skipped {}: {}", issue.subject, issue.error);
            }
            Ok(manifest.skipped_files.is_empty())
        }
        Commands::Verify { work_dir, manifest, volume_dir, output_report } => {
            let target = match (volume_dir, work_dir) {
                (Some(dir), _) => VerifyTarget::Directory(dir),
                (None, Some(work_dir)) => VerifyTarget::Manifest { work_dir, manifest },
                (None, None) => {
                    return Err(ConfigurationError("verify needs --work-dir or --volume-dir".to_string()).into());
                }
            };

            let report = controller.verify(&target, output_report.as_deref())?;
            print_verification(&report);
            Ok(report.summary.passed)
        }
        Commands::Status { work_dir, manifest } => {
            let progress = controller.status(&work_dir, manifest.as_deref())?;
            println!("{}", progress);
            Ok(progress.failed == 0)
        }
        Commands::Completions { .. } => Ok(true),
    }
}

fn print_verification(report: &manuscript::validation::VerificationReport) {
    let summary = &report.summary;
    println!("Source language: {}", report.source_language);
    println!("Target language: {}", report.target_language);
    println!("Documents: {}/{} passed", summary.passed_documents, summary.total_documents);
    println!("Files checked: {}", summary.total_files);
    println!("Remaining source characters: {}", summary.total_source_chars);

    for document in report.documents.iter().filter(|d| !d.passed) {
        println!("--- {} ---", document.document_id);
        for error in &document.errors {
            println!("  {}", error);
        }
        for file in document.files.iter().filter(|f| !f.passed) {
            println!("  {}: {}", file.file, file.errors.join("; "));
        }
        for issue in &document.layout_issues {
            println!("  {}: {}", issue.subject, issue.error);
        }
    }
}
