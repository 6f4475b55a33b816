use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("handler {index}, pattern {pattern:?}: {source}")]
    Pattern {
        index: usize,
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
