use std::mem;

use tracing::debug;

use crate::document::{Block, BlockId, BlockKind, Document, Heading, Section};
use crate::parser::Transform;

/// Deepest level that is grouped into sections. Sections at this level are
/// never subdivided.
pub const MAX_LEVEL: u8 = 6;

/// Priority at which [`Parser::new`](crate::Parser::new) registers the
/// section transform.
pub const SECTION_PRIORITY: u32 = 2000;

/// Groups the top-level blocks of a document into nested sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionTransform;

impl Transform for SectionTransform {
    fn transform(&self, doc: &mut Document) {
        let root = doc.root();
        let items = mem::take(&mut doc.block_mut(root).children);
        let sections = compile_sections(doc, items, 1);
        doc.block_mut(root).children = sections;
    }
}

/// A section that is still collecting content.
#[derive(Default)]
struct Pending {
    heading: Option<BlockId>,
    children: Vec<BlockId>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.heading.is_none() && self.children.is_empty()
    }
}

/// Partitions `items` into sections delimited by headings of `level`, then
/// repeats for the content of each headed section at the next level. Returns
/// the new list of items, which consists only of sections.
fn compile_sections(doc: &mut Document, items: Vec<BlockId>, level: u8) -> Vec<BlockId> {
    let mut sections = Vec::new();
    let mut current = Pending::default();

    for item in items {
        if doc.heading(item).is_some_and(|h| h.level == level) {
            if !current.is_empty() {
                sections.push(emit(doc, current, level));
            }
            // Begin next section.
            current = Pending {
                heading: Some(item),
                children: Vec::new(),
            };
        } else {
            current.children.push(item);
        }
    }
    if !current.is_empty() {
        sections.push(emit(doc, current, level));
    }

    if level >= MAX_LEVEL {
        return sections;
    }
    for &id in &sections {
        let headed = doc.section(id).is_some_and(|s| !s.is_orphan());
        if headed {
            let children = mem::take(&mut doc.block_mut(id).children);
            let nested = compile_sections(doc, children, level + 1);
            doc.block_mut(id).children = nested;
        }
    }
    sections
}

fn emit(doc: &mut Document, pending: Pending, level: u8) -> BlockId {
    let name = pending
        .heading
        .and_then(|id| doc.heading(id))
        .map(section_name)
        .unwrap_or_default();

    let span = pending
        .heading
        .iter()
        .chain(&pending.children)
        .map(|&id| doc.block(id).span.clone())
        .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end))
        .unwrap_or(0..0);

    debug!(
        name = %name,
        level,
        orphan = pending.heading.is_none(),
        blocks = pending.children.len(),
        "section"
    );

    doc.push(Block {
        kind: BlockKind::Section(Section {
            heading: pending.heading,
            name,
            level,
        }),
        children: pending.children,
        events: 0..0,
        span,
    })
}

/// Resolves the name of a section from its heading: the `section` attribute,
/// then the `id` attribute, then the heading text.
fn section_name(heading: &Heading) -> String {
    heading
        .attribute("section")
        .or_else(|| heading.attribute("id"))
        .unwrap_or(&heading.text)
        .to_string()
}
