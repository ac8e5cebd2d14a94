//! Error registry — every public operation returns one of these
//! categories.  Categories are stable; matching on them is supported
//! API.  I/O errors from the OS are surfaced verbatim via `Io`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The requested label does not exist.
    #[error("label not found")]
    NotFound,
    /// Rename target already exists.
    #[error("label already exists")]
    Exists,
    /// Label is empty, contains a raw `"`, or a control character.
    #[error("invalid label: {0}")]
    InvalidLabel(String),
    /// Label exceeds the 256-byte limit.
    #[error("label exceeds 256 bytes")]
    LabelTooLong,
    /// Set was called with empty content.
    #[error("content is empty")]
    EmptyContent,
    /// Operation after Close.
    #[error("store is closed")]
    Closed,
    /// Search/Match pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    /// Header line is not parseable, has a bad version, or violates a
    /// section-boundary invariant.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    /// A record line could not be parsed where full parsing is required.
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },
    /// An index line in the sorted section could not be parsed; the
    /// offset it supplies cannot be trusted.
    #[error("corrupt index at offset {offset}: {reason}")]
    CorruptIndex { offset: u64, reason: String },
    /// A history snapshot failed base85 or zstd decoding.
    #[error("snapshot decode failed: {0}")]
    Decompress(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
