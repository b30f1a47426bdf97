/*!
 * Task ledger.
 *
 * - `models`: task and manifest records
 * - `layout`: deterministic work directory paths and id derivation
 * - `builder`: incremental, collision-free task assignment
 * - `status`: task status observation and atomic publication
 * - `analysis`: the analysis phase producing a manifest
 */

pub mod analysis;
pub mod builder;
pub mod layout;
pub mod models;
pub mod status;

// Re-export main types
pub use analysis::{AnalysisReport, Analyzer};
pub use builder::LedgerBuilder;
pub use layout::WorkLayout;
pub use models::{DocumentEntry, Manifest, Progress, Task, TaskType};
pub use status::{StatusBoard, TaskStatus};
