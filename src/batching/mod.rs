/*!
 * Token-budget batching.
 *
 * - `tokens`: approximate, script-aware token estimate
 * - `packer`: greedy packing of named text units into bounded chunks
 * - `extract`: review text extraction and the validation chunk manifest
 */

pub mod extract;
pub mod packer;
pub mod tokens;

// Re-export main types
pub use extract::{Extraction, Extractor, ValidationManifest, ValidationTask};
pub use packer::{Chunk, Packer, TextUnit};
pub use tokens::estimate_tokens;
