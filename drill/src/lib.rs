//! Primitives for tree structures that can be drilled into.
//!
//! A [`Node`] exposes any subset of a small set of capabilities (fragment
//! production, ordered and unordered children, traversal overrides). The
//! functions in [`traverse`] walk a tree purely through those capabilities,
//! so a caller never needs to know what kind of content it is looking at.

pub mod error;
pub mod node;
pub mod query;
pub mod traverse;

pub use error::Error;
pub use node::{Descender, Node, NodeRef, OrderedBranch, Queryer, ReaderNode, UnorderedBranch};
pub use query::Query;
pub use traverse::{descend, descendants, index, query};
