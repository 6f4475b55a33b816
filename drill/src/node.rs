use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::error::Error;
use crate::query::Query;

/// A shared handle to a node. Nodes are cheap read-only views, so handing
/// out clones of the handle is the normal way to retain one.
pub type NodeRef = Arc<dyn Node>;

/// Implemented by anything that can produce a fragment.
///
/// The remaining capabilities are reached through the `as_*` methods. A node
/// implements a capability when the corresponding method returns `Some`.
pub trait Node: Send + Sync {
    /// Returns the data represented by the node. Returns an empty string if
    /// the node has no data, or an error occurs.
    fn fragment(&self) -> String;

    fn as_reader(&self) -> Option<&dyn ReaderNode> {
        None
    }

    fn as_ordered(&self) -> Option<&dyn OrderedBranch> {
        None
    }

    fn as_unordered(&self) -> Option<&dyn UnorderedBranch> {
        None
    }

    fn as_descender(&self) -> Option<&dyn Descender> {
        None
    }

    fn as_queryer(&self) -> Option<&dyn Queryer> {
        None
    }
}

/// Produces a fragment as a stream.
pub trait ReaderNode {
    fn fragment_reader(&self) -> Result<Box<dyn Read + Send>, Error>;
}

/// A node with positional children.
pub trait OrderedBranch {
    /// Number of ordered child nodes. Zero means the node has no positional
    /// children, not that ordering is unsupported.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the child at index `i`, following the boundary rules of
    /// [`index`](crate::traverse::index). Returns `None` if `i` is out of
    /// bounds or the node has no children.
    fn ordered_child(&self, i: isize) -> Option<NodeRef>;

    /// Returns a retainable list of the ordered children.
    fn ordered_children(&self) -> Vec<NodeRef>;
}

/// A node with keyed children.
pub trait UnorderedBranch {
    /// Returns the child matching `name`, or `None` if there is none.
    fn unordered_child(&self, name: &str) -> Option<NodeRef>;

    /// Returns a retainable map of names to children.
    fn unordered_children(&self) -> HashMap<String, NodeRef>;
}

/// Overrides named descent for the node and everything below it.
pub trait Descender {
    fn descend(&self, names: &[&str]) -> Option<NodeRef>;
}

/// Overrides typed queries for the node and everything below it.
pub trait Queryer {
    fn query(&self, queries: &[Query]) -> Option<NodeRef>;
}
