use std::fmt;
use std::ops::Range;

use pulldown_cmark::{Event, Tag};

/// Position of a block within a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    /// The document block (always 0).
    pub const ROOT: BlockId = BlockId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A parsed Markdown document: the source text, the owned event stream
/// produced by the parser, and an arena of blocks arranged into a tree.
///
/// A document is built once and never changes afterwards. Views over it share
/// it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    events: Vec<Event<'static>>,
    blocks: Vec<Block>,
}

/// A node in the block tree.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    /// Child blocks, in document order. For a section these are the blocks
    /// owned by the section, not including its heading.
    pub children: Vec<BlockId>,
    /// Range into [`Document::events`] for leaf blocks. Empty otherwise.
    pub events: Range<usize>,
    /// Byte span in the source text.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Document,
    Heading(Heading),
    /// Any other top-level block: paragraph, list, code block, table, etc.
    Content,
    Section(Section),
}

/// Heading data captured at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// Heading level, 1 (`#`) through 6 (`######`).
    pub level: u8,
    /// The `{#id}` attribute.
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Remaining `{key=value}` attributes.
    pub attrs: Vec<(String, Option<String>)>,
    /// Plain text content of the heading.
    pub text: String,
}

impl Heading {
    /// Returns the value of the attribute named `key`. The `id` key also
    /// matches the `{#id}` shorthand. Attributes without a value are treated
    /// as absent.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        if key == "id" {
            if let Some(id) = &self.id {
                return Some(id);
            }
        }
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// A group of blocks delimited by headings.
///
/// A section without a heading is "orphaned": it holds the content that
/// precedes the first heading of its level.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: Option<BlockId>,
    pub name: String,
    /// Nesting level, 1 through 6.
    pub level: u8,
}

impl Section {
    pub fn is_orphan(&self) -> bool {
        self.heading.is_none()
    }
}

impl Document {
    /// Creates a document containing only the root block.
    pub(crate) fn new(source: String, events: Vec<Event<'static>>) -> Self {
        let root = Block {
            kind: BlockKind::Document,
            children: Vec::new(),
            events: 0..0,
            span: 0..source.len(),
        };
        Document {
            source,
            events,
            blocks: vec![root],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn events(&self) -> &[Event<'static>] {
        &self.events
    }

    pub fn root(&self) -> BlockId {
        BlockId::ROOT
    }

    /// Returns the block at `id`.
    ///
    /// Panics if `id` was not issued by this document.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Number of blocks in the arena, including the root.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the document has no content blocks.
    pub fn is_empty(&self) -> bool {
        self.children(BlockId::ROOT).is_empty()
    }

    pub fn children(&self, id: BlockId) -> &[BlockId] {
        &self.block(id).children
    }

    pub fn heading(&self, id: BlockId) -> Option<&Heading> {
        match &self.block(id).kind {
            BlockKind::Heading(heading) => Some(heading),
            _ => None,
        }
    }

    pub fn section(&self, id: BlockId) -> Option<&Section> {
        match &self.block(id).kind {
            BlockKind::Section(section) => Some(section),
            _ => None,
        }
    }

    /// Iterates over the sections that are direct children of `id`. Sections
    /// nested inside those are not visited.
    pub fn child_sections(&self, id: BlockId) -> impl Iterator<Item = (BlockId, &Section)> + '_ {
        self.children(id)
            .iter()
            .filter_map(|&child| self.section(child).map(|section| (child, section)))
    }

    /// Visits the leaf blocks under `id` in rendering order. A section yields
    /// its heading first, then its children.
    pub fn walk_leaves(&self, id: BlockId, visit: &mut dyn FnMut(BlockId, &Block)) {
        let block = self.block(id);
        match &block.kind {
            BlockKind::Heading(_) | BlockKind::Content => visit(id, block),
            BlockKind::Section(section) => {
                if let Some(heading) = section.heading {
                    self.walk_leaves(heading, visit);
                }
                for &child in &block.children {
                    self.walk_leaves(child, visit);
                }
            }
            BlockKind::Document => {
                for &child in &block.children {
                    self.walk_leaves(child, visit);
                }
            }
        }
    }

    /// Returns the events of a leaf block.
    pub fn leaf_events(&self, id: BlockId) -> &[Event<'static>] {
        &self.events[self.block(id).events.clone()]
    }

    pub(crate) fn push(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Returns an indented outline of the block tree, for debugging.
    pub fn dump(&self) -> Dump<'_> {
        Dump { doc: self }
    }
}

/// Display adapter returned by [`Document::dump`].
pub struct Dump<'a> {
    doc: &'a Document,
}

impl Dump<'_> {
    fn write_block(&self, f: &mut fmt::Formatter<'_>, id: BlockId, depth: usize) -> fmt::Result {
        let block = self.doc.block(id);
        let pad = "  ".repeat(depth);
        match &block.kind {
            BlockKind::Document => writeln!(f, "{}Document {:?}", pad, block.span)?,
            BlockKind::Heading(heading) => writeln!(
                f,
                "{}Heading {} {:?} {:?}",
                pad, heading.level, heading.text, block.span
            )?,
            BlockKind::Content => {
                let label = match self.doc.leaf_events(id).first() {
                    Some(Event::Start(tag)) => tag_label(tag),
                    Some(Event::Rule) => "Rule",
                    _ => "Content",
                };
                writeln!(f, "{}{} {:?}", pad, label, block.span)?
            }
            BlockKind::Section(section) => {
                writeln!(
                    f,
                    "{}Section {:?} level={}{} {:?}",
                    pad,
                    section.name,
                    section.level,
                    if section.is_orphan() { " orphan" } else { "" },
                    block.span
                )?;
                if let Some(heading) = section.heading {
                    self.write_block(f, heading, depth + 1)?;
                }
            }
        }
        for &child in &block.children {
            self.write_block(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_block(f, self.doc.root(), 0)
    }
}

fn tag_label(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Paragraph => "Paragraph",
        Tag::BlockQuote(_) => "BlockQuote",
        Tag::CodeBlock(_) => "CodeBlock",
        Tag::HtmlBlock => "HtmlBlock",
        Tag::List(Some(_)) => "OrderedList",
        Tag::List(None) => "List",
        Tag::FootnoteDefinition(_) => "FootnoteDefinition",
        Tag::Table(_) => "Table",
        Tag::MetadataBlock(_) => "MetadataBlock",
        _ => "Block",
    }
}
