use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drill::{Node, NodeRef, ReaderNode};
use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::error::Error;

/// Produces a node from the file at the given path, usually by reading the
/// file and interpreting its contents. Returns `None` if the file cannot be
/// interpreted.
pub type HandlerFn = Arc<dyn Fn(&Path) -> Option<NodeRef> + Send + Sync>;

/// Maps a glob pattern to a [`HandlerFn`].
#[derive(Clone)]
pub struct Handler {
    pub pattern: String,
    pub func: HandlerFn,
}

impl Handler {
    pub fn new(pattern: impl Into<String>, func: HandlerFn) -> Self {
        Handler {
            pattern: pattern.into(),
            func,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// An ordered list of handlers with compiled patterns.
#[derive(Clone, Default)]
pub struct Handlers {
    entries: Vec<(Handler, GlobMatcher)>,
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(h, _)| &h.pattern))
            .finish()
    }
}

impl Handlers {
    /// Compiles the pattern of each handler. Fails on the first malformed
    /// pattern, identifying it by position and text.
    ///
    /// Patterns follow shell glob rules; `*` and `?` do not match `/`.
    pub fn new(handlers: impl IntoIterator<Item = Handler>) -> Result<Self, Error> {
        let entries = handlers
            .into_iter()
            .enumerate()
            .map(|(index, handler)| {
                let matcher = GlobBuilder::new(&handler.pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|source| Error::Pattern {
                        index,
                        pattern: handler.pattern.clone(),
                        source,
                    })?
                    .compile_matcher();
                Ok((handler, matcher))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Handlers { entries })
    }

    /// Returns the function of the first handler whose pattern matches
    /// `name`, or `None` if no pattern matches.
    pub fn matching(&self, name: &str) -> Option<&HandlerFn> {
        self.position(name).map(|i| &self.entries[i].0.func)
    }

    /// Position of the first handler whose pattern matches `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(_, matcher)| matcher.is_match(name))
    }

    /// Returns a copy of the handlers, in order.
    pub fn handlers(&self) -> Vec<Handler> {
        self.entries.iter().map(|(h, _)| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns a handler that exposes a file's content as a leaf node.
pub fn text_handler() -> HandlerFn {
    Arc::new(|path: &Path| -> Option<NodeRef> {
        if !path.is_file() {
            debug!(path = %path.display(), "text handler: not a file");
            return None;
        }
        Some(Arc::new(TextNode {
            path: path.to_path_buf(),
        }))
    })
}

/// A file read as plain text.
struct TextNode {
    path: PathBuf,
}

impl Node for TextNode {
    fn fragment(&self) -> String {
        fs::read(&self.path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    fn as_reader(&self) -> Option<&dyn ReaderNode> {
        Some(self)
    }
}

impl ReaderNode for TextNode {
    fn fragment_reader(&self) -> Result<Box<dyn Read + Send>, drill::Error> {
        let file = File::open(&self.path)?;
        Ok(Box::new(io::BufReader::new(file)))
    }
}
