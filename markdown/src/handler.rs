use std::fs;
use std::path::Path;
use std::sync::Arc;

use drill::NodeRef;
use drill_filesys::HandlerFn;
use tracing::{debug, warn};

use crate::node::SectionNode;
use crate::options::MarkdownOptions;
use crate::parser::Parser;
use crate::render::{HtmlRenderer, Render};

/// Parses `source` into sections and returns a view of the document root
/// that renders to HTML.
pub fn open(source: impl Into<String>, options: &MarkdownOptions) -> SectionNode {
    let doc = Parser::new().with_options(options).parse(source);
    SectionNode::new(Arc::new(doc), Some(Arc::new(HtmlRenderer)))
}

/// Returns a handler that opens Markdown files as [`SectionNode`]s rendering
/// to HTML.
pub fn handler(options: MarkdownOptions) -> HandlerFn {
    handler_with(options, Arc::new(HtmlRenderer))
}

/// Like [`handler`], with the sections rendered by `renderer`.
pub fn handler_with(options: MarkdownOptions, renderer: Arc<dyn Render>) -> HandlerFn {
    Arc::new(move |path: &Path| -> Option<NodeRef> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(path = %path.display(), %err, "markdown handler: cannot read");
                return None;
            }
        };
        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(err) => {
                warn!(path = %path.display(), "markdown handler: invalid UTF-8, decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        let doc = Parser::new().with_options(&options).parse(source);
        Some(SectionNode::new(Arc::new(doc), Some(Arc::clone(&renderer))).into_ref())
    })
}
