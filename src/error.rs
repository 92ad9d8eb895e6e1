use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the indexer, the index store, and the reader cursor.
///
/// A caller can match on variant to decide whether a rebuild, an
/// argument fix, or simply giving up is appropriate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("index is stale for {path}: {reason}")]
    StaleIndex { path: PathBuf, reason: String },

    #[error("index is corrupt: {0}")]
    CorruptIndex(String),

    #[error("deflate stream is corrupt at compressed offset {c_offset}: {reason}")]
    CorruptStream { c_offset: u64, reason: String },

    #[error("requested range out of bounds: {0}")]
    OutOfRange(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
