use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::types::BlockId;

/// Storage engine error types
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Access of {len} bytes at offset {offset} is outside a {block_size}-byte page")]
    PageBounds {
        offset: usize,
        len: usize,
        block_size: usize,
    },

    #[error("No buffer became available for {block} within {waited:?}")]
    BufferPoolExhausted { block: BlockId, waited: Duration },

    #[error("Cannot remove temporary file {}: {source}", path.display())]
    StartupCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bytes at offset {offset} are not valid UTF-8")]
    InvalidString { offset: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Log record of {size} bytes exceeds the {max}-byte limit")]
    LogRecordTooLarge { size: usize, max: usize },
}

impl StrataError {
    /// Wraps an I/O error with the block or file it concerned.
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Returns true when the caller may abort and try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BufferPoolExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
