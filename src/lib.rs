/*!
 * # manuscript - document decomposition for parallel translation
 *
 * A Rust library for cutting large structured documents into independently
 * translatable pieces and putting the translated pieces back together.
 *
 * ## Features
 *
 * - Split markup documents into ordered, self-contained fragments at
 *   content-unit boundaries
 * - Track every fragment or whole document as a task in a frozen manifest
 * - Observe task completion through per-task output and status files
 * - Pack extracted text into token-bounded chunks for batched review
 * - Reassemble translated fragments with document-level fault isolation
 * - Audit translated output for residual source-script text
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Structural parsing, splitting and merging:
 *   - `document::markup`: wrapper + content-unit parser
 *   - `document::splitter`: fragment generation
 *   - `document::merger`: fragment reassembly
 * - `ledger`: Task ledger (manifest), work layout, task status and analysis
 * - `batching`: Token estimation, packing and review extraction
 * - `validation`: Verification of translated output
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language codes and script ranges
 * - `report`: Per-phase summaries and issues
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod batching;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod ledger;
pub mod report;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use batching::{Chunk, Packer, TextUnit, estimate_tokens};
pub use document::{Fragment, MarkupDocument, Merger, Splitter};
pub use errors::{ConfigurationError, MalformedOutputError, MissingFragmentError, PipelineError, StructureError};
pub use language_utils::{count_script_chars, get_language_name, language_codes_match, normalize_to_part2t};
pub use ledger::{Manifest, Task, TaskStatus, TaskType};
pub use validation::Verifier;
