use std::io::{self, Write};

use pulldown_cmark::html;

use crate::document::{BlockId, Document};

/// Renders a subtree of a document.
///
/// Sections have no output of their own: a section renders as its heading
/// followed by its children.
pub trait Render: Send + Sync {
    fn render(&self, w: &mut dyn Write, doc: &Document, block: BlockId) -> io::Result<()>;
}

/// Renders to HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Render for HtmlRenderer {
    fn render(&self, w: &mut dyn Write, doc: &Document, block: BlockId) -> io::Result<()> {
        let mut events = Vec::new();
        doc.walk_leaves(block, &mut |id, _| {
            events.extend(doc.leaf_events(id).iter().cloned());
        });
        html::write_html_io(w, events.into_iter())
    }
}

/// Writes the Markdown source spanned by the block, unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRenderer;

impl Render for SourceRenderer {
    fn render(&self, w: &mut dyn Write, doc: &Document, block: BlockId) -> io::Result<()> {
        let span = doc.block(block).span.clone();
        let text = doc.source().get(span).unwrap_or_default();
        w.write_all(text.as_bytes())
    }
}
