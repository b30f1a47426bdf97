use log::debug;

use crate::app_config::ProloguePolicy;
use crate::document::markup::{self, MarkupDocument};
use crate::errors::StructureError;

// @module: Structural splitter

// @struct: One independently translatable slice of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    // @field: Id of the document the fragment was cut from
    pub parent_document_id: String,

    // @field: 1-based position, the only ordering key downstream
    pub section_index: usize,

    // @field: Number of fragments the document was cut into
    pub total_sections: usize,

    // @field: Content units carried by this fragment
    pub units: Vec<String>,

    // @field: Rendered markup (wrapper + units)
    pub content: String,
}

/// Group sizes for splitting `count` units into at most `parts` groups.
///
/// Every group but the last holds `count / parts` units and the last one takes
/// the remainder. The part count drops to `max(1, count)` when there are fewer
/// units than parts, so no group is ever empty (except for a unit-less
/// document, which yields one empty group).
pub fn partition_sizes(count: usize, parts: usize) -> Vec<usize> {
    let parts = if count >= parts { parts.max(1) } else { count.max(1) };
    let base = count / parts;

    let mut sizes = vec![base; parts];
    if let Some(last) = sizes.last_mut() {
        *last = count - (parts - 1) * base;
    }
    sizes
}

// @struct: Cuts documents into ordered fragments
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    parts: usize,
    policy: ProloguePolicy,
}

impl Splitter {
    pub fn new(parts: usize, policy: ProloguePolicy) -> Self {
        Self { parts, policy }
    }

    /// Parse `content` and split it; see [`Splitter::split_document`]
    pub fn split(&self, document_id: &str, content: &str) -> Result<Vec<Fragment>, StructureError> {
        let document = MarkupDocument::parse(document_id, content)?;
        Ok(self.split_document(document_id, &document))
    }

    /// Split an already parsed document into `k' <= parts` fragments.
    ///
    /// Every fragment is re-wrapped with the document's header and footer.
    /// With `ProloguePolicy::FirstOnly` only fragment 1 carries the prologue.
    pub fn split_document(&self, document_id: &str, document: &MarkupDocument) -> Vec<Fragment> {
        let sizes = partition_sizes(document.units.len(), self.parts);
        let total_sections = sizes.len();

        debug!(
            "Splitting {} ({} units) into {} fragment(s): {:?}",
            document_id,
            document.units.len(),
            total_sections,
            sizes
        );

        let mut fragments = Vec::with_capacity(total_sections);
        let mut offset = 0;

        for (i, size) in sizes.into_iter().enumerate() {
            let section_index = i + 1;
            let units = document.units[offset..offset + size].to_vec();
            offset += size;

            let prologue = match self.policy {
                ProloguePolicy::EveryFragment => document.prologue.as_deref(),
                ProloguePolicy::FirstOnly if section_index == 1 => document.prologue.as_deref(),
                ProloguePolicy::FirstOnly => None,
            };
            let content = markup::render(prologue, &document.header, &units, &document.footer);

            fragments.push(Fragment {
                parent_document_id: document_id.to_string(),
                section_index,
                total_sections,
                units,
                content,
            });
        }

        fragments
    }
}
