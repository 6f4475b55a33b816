//! Directory trees as drillable nodes.
//!
//! An [`FsNode`] carries a set of [`Handlers`]; every node derived from it
//! inherits them. Descending into a file by name requires one of the handler
//! patterns to match the name. The first matching handler interprets the
//! file and produces the node that is returned.

pub mod error;
pub mod fs_node;
pub mod handlers;

pub use error::Error;
pub use fs_node::FsNode;
pub use handlers::{Handler, HandlerFn, Handlers, text_handler};
