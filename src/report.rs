/*!
 * Shared reporting types.
 *
 * Every phase walks its whole input collection, accumulating per-item
 * failures as `Issue`s, and ends with a `PhaseSummary` of counts.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// One accumulated, non-fatal problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// What the problem is about (file, task id, document/parent pair)
    pub subject: String,
    /// Rendered error message
    pub error: String,
}

impl Issue {
    pub fn new(subject: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            subject: subject.into(),
            error: error.to_string(),
        }
    }
}

/// Processed / skipped / failed counts for one phase run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseSummary {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            ..Default::default()
        }
    }

    /// True when nothing was skipped or failed
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

impl fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} skipped, {} failed",
            self.phase, self.processed, self.skipped, self.failed
        )
    }
}
