/*!
 * Document decomposition and recomposition.
 *
 * - `markup`: structural parser producing wrapper + content units
 * - `splitter`: cuts a document into ordered, independently valid fragments
 * - `markdown`: frontmatter + heading-block view of markdown documents
 * - `merger`: reassembles translated fragments into one document
 */

pub mod markdown;
pub mod markup;
pub mod merger;
pub mod splitter;

// Re-export main types
pub use markdown::{MarkdownDocument, MarkdownSplitter};
pub use markup::MarkupDocument;
pub use merger::{MergeReport, MergedFile, Merger};
pub use splitter::{Fragment, Splitter, partition_sizes};
