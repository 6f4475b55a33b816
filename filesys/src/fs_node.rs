use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use drill::{Node, NodeRef, OrderedBranch, ReaderNode, UnorderedBranch, index};
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::handlers::Handlers;

/// A file or directory, exposed as a node.
///
/// Ordered children are the entries of the directory, sorted by file name.
/// Unordered children are directories, plus files that one of the handlers
/// can interpret.
#[derive(Debug, Clone)]
pub struct FsNode {
    path: PathBuf,
    handlers: Arc<Handlers>,
}

impl FsNode {
    pub fn new(path: impl Into<PathBuf>, handlers: Handlers) -> Self {
        FsNode {
            path: path.into(),
            handlers: Arc::new(handlers),
        }
    }

    fn derive(&self, path: PathBuf) -> Self {
        FsNode {
            path,
            handlers: Arc::clone(&self.handlers),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    /// Lists the directory, sorted by file name. Empty if the node is not a
    /// directory or cannot be read.
    #[instrument(level = "trace", skip(self), fields(path = %self.path.display()))]
    fn entries(&self) -> Vec<DirEntry> {
        if !self.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(%err, "skipping unreadable entry");
                    None
                }
            })
            .collect()
    }

    /// Opens file `name` using the first matching handler.
    fn handle(&self, name: &str) -> Option<NodeRef> {
        let Some(func) = self.handlers.matching(name) else {
            debug!(name, "no handler matches");
            return None;
        };
        func(&self.path.join(name))
    }
}

/// A name must be a relative path made only of ordinary components.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

impl Node for FsNode {
    /// Returns the content of the file. Returns an empty string if the file
    /// does not exist, is a directory, or cannot be read.
    fn fragment(&self) -> String {
        fs::read(&self.path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
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
}

impl ReaderNode for FsNode {
    /// Opens the file.
    fn fragment_reader(&self) -> Result<Box<dyn Read + Send>, drill::Error> {
        if self.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", self.path.display()),
            )
            .into());
        }
        let file = File::open(&self.path)?;
        Ok(Box::new(io::BufReader::new(file)))
    }
}

impl OrderedBranch for FsNode {
    /// Number of entries in the directory.
    fn len(&self) -> usize {
        self.entries().len()
    }

    fn ordered_child(&self, i: isize) -> Option<NodeRef> {
        let mut entries = self.entries();
        let i = index(i, entries.len())?;
        let entry = entries.swap_remove(i);
        Some(Arc::new(self.derive(entry.into_path())))
    }

    fn ordered_children(&self) -> Vec<NodeRef> {
        self.entries()
            .into_iter()
            .map(|entry| Arc::new(self.derive(entry.into_path())) as NodeRef)
            .collect()
    }
}

impl UnorderedBranch for FsNode {
    /// Returns the directory or handled file matching `name`.
    fn unordered_child(&self, name: &str) -> Option<NodeRef> {
        if !valid_name(name) {
            debug!(name, "invalid name");
            return None;
        }
        let path = self.path.join(name);
        if path.is_dir() {
            return Some(Arc::new(self.derive(path)));
        }
        self.handle(name)
    }

    fn unordered_children(&self) -> HashMap<String, NodeRef> {
        let mut children = HashMap::new();
        for entry in self.entries() {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "skipping non-UTF-8 file name");
                continue;
            };
            let child = if entry.path().is_dir() {
                Some(Arc::new(self.derive(entry.into_path())) as NodeRef)
            } else {
                self.handle(&name)
            };
            if let Some(child) = child {
                children.insert(name, child);
            }
        }
        children
    }
}
