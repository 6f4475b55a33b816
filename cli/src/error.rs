use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config '{}': {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Handlers(#[from] drill_filesys::Error),

    #[error("no handler for '{}'", .0.display())]
    NoHandler(PathBuf),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("--ast requires a markdown file")]
    AstUnsupported,

    #[error("cannot stream fragment: {0}")]
    Stream(#[from] drill::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
