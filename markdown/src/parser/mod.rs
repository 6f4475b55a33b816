mod blocks;

use std::cmp::Reverse;

use tracing::debug;

use crate::document::Document;
use crate::options::MarkdownOptions;
use crate::section::{SECTION_PRIORITY, SectionTransform};

/// A pass over a freshly parsed document, run before the document is handed
/// out. Passes may restructure the block tree.
pub trait Transform: Send + Sync {
    fn transform(&self, doc: &mut Document);
}

/// Parser entry point.
pub struct Parser {
    options: MarkdownOptions,
    /// Sorted by descending priority.
    transforms: Vec<(u32, Box<dyn Transform>)>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Returns a parser that groups content into sections.
    pub fn new() -> Self {
        Self::bare().with_transform(SECTION_PRIORITY, SectionTransform)
    }

    /// Returns a parser without any transforms; the block tree stays flat.
    pub fn bare() -> Self {
        Parser {
            options: MarkdownOptions::default(),
            transforms: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: &MarkdownOptions) -> Self {
        self.options = options.clone();
        self
    }

    /// Registers a transform. Transforms with a higher priority run first;
    /// transforms with equal priority run in registration order.
    pub fn with_transform(mut self, priority: u32, transform: impl Transform + 'static) -> Self {
        self.transforms.push((priority, Box::new(transform)));
        self.transforms.sort_by_key(|(priority, _)| Reverse(*priority));
        self
    }

    /// Parse the source Markdown into a block tree and run every transform
    /// over it.
    pub fn parse(&self, source: impl Into<String>) -> Document {
        let mut doc = blocks::parse_blocks(source.into(), &self.options);
        debug!(
            blocks = doc.block_count(),
            transforms = self.transforms.len(),
            "parsed document"
        );
        for (_, transform) in &self.transforms {
            transform.transform(&mut doc);
        }
        doc
    }
}
