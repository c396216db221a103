//! Error types for WaveForge

use thiserror::Error;

/// Block store error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown block id: {0}")]
    UnknownBlock(u64),

    #[error("block read out of bounds: offset {offset} + len {len} > block len {block_len}")]
    ReadOutOfBounds {
        offset: u64,
        len: u64,
        block_len: u64,
    },

    #[error("block allocation failed: {0}")]
    Alloc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Editing engine error type
///
/// Structural operations either fully succeed or leave the track in its
/// prior, valid state. Storage failures propagate upward unchanged.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("insufficient space: {0}")]
    InsufficientSpace(String),

    #[error("block store failure: {0}")]
    Storage(#[from] StoreError),
}

/// Result type alias for block store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for editing operations
pub type EditResult<T> = Result<T, EditError>;
