use std::sync::Arc;

use tracing::trace;

use crate::node::{Node, NodeRef, OrderedBranch};
use crate::query::Query;

/// Normalizes `i` against a sequence of length `len`.
///
/// Negative values wrap around, so that -1 selects the last element. Returns
/// `None` if the wrapped index is still out of bounds, or if `len` is zero.
///
/// This may be used to implement [`OrderedBranch::ordered_child`].
pub fn index(i: isize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len = isize::try_from(len).ok()?;
    let i = if i < 0 { i.checked_add(len)? } else { i };
    if i < 0 || i >= len {
        return None;
    }
    Some(i as usize)
}

/// Descends into the unordered children matching each name in turn. Returns
/// `None` as soon as a child cannot be found.
///
/// If a node along the way implements [`Descender`](crate::Descender), the
/// remaining names are handed to it and its result is returned as-is.
pub fn descend(node: NodeRef, names: &[&str]) -> Option<NodeRef> {
    let mut node = node;
    for (i, name) in names.iter().enumerate() {
        if let Some(descender) = node.as_descender() {
            return descender.descend(&names[i..]);
        }
        let Some(branch) = node.as_unordered() else {
            trace!(step = i, name, "descend: node has no unordered children");
            return None;
        };
        let Some(child) = branch.unordered_child(name) else {
            trace!(step = i, name, "descend: child not found");
            return None;
        };
        node = child;
    }
    Some(node)
}

/// Descends into the children matching each query in turn. A key selects an
/// unordered child, an index selects an ordered child. Returns `None` as soon
/// as a step cannot be satisfied.
///
/// If a node along the way implements [`Queryer`](crate::Queryer), the
/// remaining queries are handed to it and its result is returned as-is.
pub fn query(node: NodeRef, queries: &[Query]) -> Option<NodeRef> {
    let mut node = node;
    for (i, q) in queries.iter().enumerate() {
        if let Some(queryer) = node.as_queryer() {
            return queryer.query(&queries[i..]);
        }
        let child = match q {
            Query::Key(name) => {
                let Some(branch) = node.as_unordered() else {
                    trace!(step = i, %q, "query: node has no unordered children");
                    return None;
                };
                branch.unordered_child(name)
            }
            Query::Index(n) => {
                let Some(branch) = node.as_ordered() else {
                    trace!(step = i, %q, "query: node has no ordered children");
                    return None;
                };
                index(*n, branch.len()).and_then(|i| branch.ordered_child(i as isize))
            }
        };
        let Some(child) = child else {
            trace!(step = i, %q, "query: child not found");
            return None;
        };
        node = child;
    }
    Some(node)
}

/// Returns every ordered descendant of `node` in depth-first pre-order.
///
/// A child is only walked into when the child itself implements
/// [`OrderedBranch`]; anything below a node without ordered children is
/// skipped.
pub fn descendants(node: Option<&dyn Node>) -> Vec<NodeRef> {
    let mut list = Vec::new();
    if let Some(branch) = node.and_then(|n| n.as_ordered()) {
        collect_descendants(&mut list, branch);
    }
    list
}

fn collect_descendants(list: &mut Vec<NodeRef>, branch: &dyn OrderedBranch) {
    for child in branch.ordered_children() {
        list.push(Arc::clone(&child));
        if let Some(sub) = child.as_ordered() {
            collect_descendants(list, sub);
        }
    }
}
