use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::ops::Range;
use std::sync::Arc;
use std::thread;

use drill::{
    Descender, Error, Node, NodeRef, OrderedBranch, Query, Queryer, ReaderNode, UnorderedBranch,
    index,
};
use tracing::{debug, trace};

use crate::document::{BlockId, Document, Section};
use crate::pipe::pipe;
use crate::render::Render;

/// A view of a document or one of its sections.
///
/// The view created by [`SectionNode::new`] wraps the document root. Views
/// derived from it share the same document and renderer, and differ only in
/// the block they point at.
#[derive(Clone)]
pub struct SectionNode {
    doc: Arc<Document>,
    renderer: Option<Arc<dyn Render>>,
    block: BlockId,
}

impl fmt::Debug for SectionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionNode")
            .field("block", &self.block)
            .field("name", &self.name())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl SectionNode {
    pub fn new(doc: Arc<Document>, renderer: Option<Arc<dyn Render>>) -> Self {
        let block = doc.root();
        SectionNode {
            doc,
            renderer,
            block,
        }
    }

    /// Returns a copy of the view that renders with `renderer`.
    pub fn with_renderer(&self, renderer: Option<Arc<dyn Render>>) -> Self {
        SectionNode {
            doc: Arc::clone(&self.doc),
            renderer,
            block: self.block,
        }
    }

    fn derive(&self, block: BlockId) -> Self {
        SectionNode {
            doc: Arc::clone(&self.doc),
            renderer: self.renderer.clone(),
            block,
        }
    }

    /// Returns the view of the document root from which this view derives.
    pub fn root(&self) -> SectionNode {
        self.derive(self.doc.root())
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    /// The wrapped block: the document root or a section.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// The wrapped section, or `None` for the document root.
    pub fn section(&self) -> Option<&Section> {
        self.doc.section(self.block)
    }

    pub fn name(&self) -> Option<&str> {
        self.section().map(|s| s.name.as_str())
    }

    /// Byte span of the wrapped block in the document source.
    pub fn span(&self) -> Range<usize> {
        self.doc.block(self.block).span.clone()
    }

    /// Iterates over the direct child sections of the wrapped block.
    pub fn child_sections(&self) -> impl Iterator<Item = (BlockId, &Section)> + '_ {
        self.doc.child_sections(self.block)
    }

    /// Returns the child section at index `i`, with negative indices counting
    /// from the end.
    pub fn child_at(&self, i: isize) -> Option<SectionNode> {
        let i = index(i, self.child_sections().count())?;
        self.child_sections()
            .nth(i)
            .map(|(id, _)| self.derive(id))
    }

    /// Returns the first child section named `name`.
    pub fn child_named(&self, name: &str) -> Option<SectionNode> {
        self.child_sections()
            .find(|(_, section)| section.name == name)
            .map(|(id, _)| self.derive(id))
    }

    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }
}

impl Node for SectionNode {
    /// Renders the wrapped block. Returns an empty string if rendering fails,
    /// or the node has no renderer.
    fn fragment(&self) -> String {
        let Some(renderer) = &self.renderer else {
            return String::new();
        };
        let mut buf = Vec::new();
        if let Err(err) = renderer.render(&mut buf, &self.doc, self.block) {
            debug!(block = ?self.block, %err, "fragment render failed");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }

    fn as_reader(&self) -> Option<&dyn ReaderNode> {
        Some(self)
    }

    fn as_ordered(&self) -> Option<&dyn OrderedBranch> {
        Some(self)
    }

    fn as_unordered(&self) -> Option<&dyn UnorderedBranch> {
        Some(self)
    }

    fn as_descender(&self) -> Option<&dyn Descender> {
        Some(self)
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        Some(self)
    }
}

impl ReaderNode for SectionNode {
    /// Returns a reader that receives the rendered block as it is produced by
    /// a background thread. A render failure surfaces as a read error.
    fn fragment_reader(&self) -> Result<Box<dyn Read + Send>, Error> {
        let renderer = self.renderer.clone().ok_or(Error::NoRenderer)?;
        let doc = Arc::clone(&self.doc);
        let block = self.block;
        let (reader, mut writer) = pipe();
        thread::Builder::new()
            .name("drill-render".to_string())
            .spawn(move || {
                let result = renderer
                    .render(&mut writer, &doc, block)
                    .and_then(|()| writer.flush());
                if let Err(err) = result {
                    debug!(block = ?block, %err, "streamed render stopped");
                    writer.close_with_error(err);
                }
            })?;
        Ok(Box::new(reader))
    }
}

impl OrderedBranch for SectionNode {
    /// Number of child sections.
    fn len(&self) -> usize {
        self.child_sections().count()
    }

    fn ordered_child(&self, i: isize) -> Option<NodeRef> {
        self.child_at(i).map(SectionNode::into_ref)
    }

    fn ordered_children(&self) -> Vec<NodeRef> {
        self.child_sections()
            .map(|(id, _)| self.derive(id).into_ref())
            .collect()
    }
}

impl UnorderedBranch for SectionNode {
    fn unordered_child(&self, name: &str) -> Option<NodeRef> {
        self.child_named(name).map(SectionNode::into_ref)
    }

    /// Maps section names to sections. When names repeat, the first section
    /// with the name wins, matching [`unordered_child`](Self::unordered_child).
    fn unordered_children(&self) -> HashMap<String, NodeRef> {
        let mut children = HashMap::new();
        for (id, section) in self.child_sections() {
            children
                .entry(section.name.clone())
                .or_insert_with(|| self.derive(id).into_ref());
        }
        children
    }
}

impl Descender for SectionNode {
    fn descend(&self, names: &[&str]) -> Option<NodeRef> {
        let mut node = self.clone();
        for (step, name) in names.iter().enumerate() {
            let Some(child) = node.child_named(name) else {
                trace!(step, name, "section descend: not found");
                return None;
            };
            node = child;
        }
        Some(node.into_ref())
    }
}

impl Queryer for SectionNode {
    fn query(&self, queries: &[Query]) -> Option<NodeRef> {
        let mut node = self.clone();
        for (step, q) in queries.iter().enumerate() {
            let child = match q {
                Query::Key(name) => node.child_named(name),
                Query::Index(i) => node.child_at(*i),
            };
            let Some(child) = child else {
                trace!(step, %q, "section query: not found");
                return None;
            };
            node = child;
        }
        Some(node.into_ref())
    }
}
