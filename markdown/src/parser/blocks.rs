use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Parser as CmarkParser, Tag, TagEnd};

use crate::document::{Block, BlockId, BlockKind, Document, Heading};
use crate::options::MarkdownOptions;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse Markdown source text into a flat block tree: the root's children are
/// the top-level blocks of the document, in order.
pub(crate) fn parse_blocks(source: String, options: &MarkdownOptions) -> Document {
    let (events, ranges): (Vec<Event<'static>>, Vec<Range<usize>>) =
        CmarkParser::new_ext(&source, options.to_cmark())
            .into_offset_iter()
            .map(|(event, range)| (event.into_static(), range))
            .unzip();

    let mut doc = Document::new(source, events);
    let top = collect_top_level(&mut doc, &ranges);
    doc.block_mut(BlockId::ROOT).children = top;
    doc
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Split the event stream into top-level runs. A run is either a container
/// (Start through its matching End) or a single standalone event such as a
/// rule.
fn collect_top_level(doc: &mut Document, ranges: &[Range<usize>]) -> Vec<BlockId> {
    let mut runs = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, event) in doc.events().iter().enumerate() {
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    runs.push(start..i + 1);
                }
            }
            _ if depth == 0 => runs.push(i..i + 1),
            _ => {}
        }
    }

    runs.into_iter()
        .map(|run| {
            let span = ranges[run.start].clone();
            let kind = match &doc.events()[run.start] {
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => BlockKind::Heading(Heading {
                    level: heading_level_to_u8(level),
                    id: id.as_ref().map(|id| id.to_string()),
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    text: collect_heading_text(&doc.events()[run.clone()]),
                }),
                _ => BlockKind::Content,
            };
            doc.push(Block {
                kind,
                children: Vec::new(),
                events: run,
                span,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Collect heading text (all Text and Code events until End(Heading)).
fn collect_heading_text(events: &[Event<'_>]) -> String {
    let mut name = String::new();
    for event in events.iter().skip(1) {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(s) | Event::Code(s) => name.push_str(s),
            _ => {}
        }
    }
    name
}
