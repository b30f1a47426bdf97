/*!
 * Verification of translated output.
 *
 * - `verifier`: residual source-script counts, structural validity,
 *   target-language markers and volume layout checks
 */

pub mod verifier;

// Re-export main types
pub use verifier::{DocumentReport, FileReport, VerificationReport, VerificationSummary, Verifier};
