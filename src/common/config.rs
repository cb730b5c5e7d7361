use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{Result, StrataError};

/// Size of a block (and of every page) in bytes (4 KB)
pub const BLOCK_SIZE: usize = 4096;

/// Default buffer pool size (number of frames)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 8;

/// Longest time a pin request waits for an unpinned frame
pub const MAX_PIN_WAIT: Duration = Duration::from_secs(10);

/// Files whose name starts with this prefix hold scratch tables and are
/// purged when the block store starts
pub const TEMP_FILE_PREFIX: &str = "temp";

/// Name of the write-ahead log file inside the database directory
pub const DEFAULT_LOG_FILE: &str = "wal.log";

/// Size of the length prefix in front of byte strings stored on a page
pub const INT_SIZE: usize = 4;

/// Environment variable overriding the buffer pool size
pub const BUFFER_POOL_SIZE_ENV: &str = "STRATA_BUFFER_POOL_SIZE";

/// Environment variable overriding the block size
pub const BLOCK_SIZE_ENV: &str = "STRATA_BLOCK_SIZE";

/// Settings used to open a [`StorageEngine`](crate::engine::StorageEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding every database file
    pub db_dir: PathBuf,
    /// Block size in bytes
    pub block_size: usize,
    /// Number of frames in the buffer pool
    pub buffer_pool_size: usize,
    /// Bounded wait for `pin` when every frame is pinned
    pub max_pin_wait: Duration,
    /// Log file name, relative to `db_dir`
    pub log_file: String,
}

impl StorageConfig {
    /// Creates a configuration with default sizes for the given directory.
    pub fn new<P: AsRef<Path>>(db_dir: P) -> Self {
        Self {
            db_dir: db_dir.as_ref().to_path_buf(),
            block_size: BLOCK_SIZE,
            buffer_pool_size: DEFAULT_BUFFER_POOL_SIZE,
            max_pin_wait: MAX_PIN_WAIT,
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }

    /// Creates a configuration for the given directory, taking the buffer
    /// pool size and block size from the environment when they are set.
    pub fn from_env<P: AsRef<Path>>(db_dir: P) -> Result<Self> {
        let mut config = Self::new(db_dir);
        if let Some(size) = read_env_usize(BUFFER_POOL_SIZE_ENV)? {
            config.buffer_pool_size = size;
        }
        if let Some(size) = read_env_usize(BLOCK_SIZE_ENV)? {
            config.block_size = size;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_buffer_pool_size(mut self, buffer_pool_size: usize) -> Self {
        self.buffer_pool_size = buffer_pool_size;
        self
    }

    pub fn with_max_pin_wait(mut self, max_pin_wait: Duration) -> Self {
        self.max_pin_wait = max_pin_wait;
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<String>) -> Self {
        self.log_file = log_file.into();
        self
    }

    /// Checks that the configuration describes a usable engine.
    pub fn validate(&self) -> Result<()> {
        // A log block needs its boundary plus one length-prefixed record.
        if self.block_size <= 2 * INT_SIZE || self.block_size > i32::MAX as usize {
            return Err(StrataError::InvalidConfig(format!(
                "block size {} must be between {} and {} bytes",
                self.block_size,
                2 * INT_SIZE + 1,
                i32::MAX
            )));
        }
        if self.buffer_pool_size == 0 {
            return Err(StrataError::InvalidConfig(
                "buffer pool needs at least one frame".to_string(),
            ));
        }
        if self.log_file.is_empty() {
            return Err(StrataError::InvalidConfig(
                "log file name is empty".to_string(),
            ));
        }
        if self.log_file.starts_with(TEMP_FILE_PREFIX) {
            return Err(StrataError::InvalidConfig(format!(
                "log file '{}' would be purged as a temporary file",
                self.log_file
            )));
        }
        Ok(())
    }
}

fn read_env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| StrataError::InvalidConfig(format!("{name}={value}: {e}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(StrataError::InvalidConfig(format!("{name}: {e}"))),
    }
}
