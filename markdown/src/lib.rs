//! Markdown documents as drillable trees.
//!
//! The content of a document is divided into a tree of sections, delimited
//! by headings. A section can be drilled into, with the name corresponding to
//! the section's heading.
//!
//! A section contains all the content that follows a heading, up to the next
//! heading of the same level. Content that follows the section's heading and
//! precedes the first sub-heading is contained within an "orphaned" section.
//! The name of this section is an empty string, and it is always the first
//! child section.

pub mod document;
pub mod handler;
pub mod node;
pub mod options;
pub mod parser;
pub mod pipe;
pub mod render;
pub mod section;

pub use document::{Block, BlockId, BlockKind, Document, Heading, Section};
pub use handler::{handler, handler_with, open};
pub use node::SectionNode;
pub use options::MarkdownOptions;
pub use parser::{Parser, Transform};
pub use render::{HtmlRenderer, Render, SourceRenderer};
pub use section::{MAX_LEVEL, SECTION_PRIORITY, SectionTransform};
