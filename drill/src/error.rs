use std::io;

use thiserror::Error;

/// Failures a node may report while producing content.
///
/// A missing child or an empty fragment is never an `Error`; those are
/// reported as `None` or `""`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no renderer")]
    NoRenderer,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
