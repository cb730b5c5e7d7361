use std::sync::Arc;

use tracing::info;

use crate::buffer::BufferPoolManager;
use crate::common::{Result, StorageConfig};
use crate::storage::disk::{BlockStore, FileManager};
use crate::wal::LogFile;

/// StorageEngine opens the block store, the log and the buffer pool for one
/// database directory and hands them out to the layers above.
pub struct StorageEngine {
    config: StorageConfig,
    file_manager: Arc<FileManager>,
    log_manager: Arc<LogFile>,
    buffer_pool: Arc<BufferPoolManager>,
}

impl StorageEngine {
    /// Opens (or creates) the database described by `config`. Leftover
    /// temporary files are removed before anything else runs; if that fails
    /// the engine does not start.
    pub fn open(config: StorageConfig) -> Result<Self> {
        config.validate()?;

        let file_manager = Arc::new(FileManager::new(&config.db_dir, config.block_size)?);
        let log_manager = Arc::new(LogFile::new(file_manager.clone(), config.log_file.as_str())?);
        let buffer_pool = Arc::new(BufferPoolManager::with_max_wait(
            config.buffer_pool_size,
            file_manager.clone(),
            log_manager.clone(),
            config.max_pin_wait,
        ));

        if file_manager.is_new_database() {
            info!(dir = %config.db_dir.display(), "creating new database");
        } else {
            info!(dir = %config.db_dir.display(), "opening existing database");
        }
        info!(
            block_size = config.block_size,
            buffers = config.buffer_pool_size,
            "storage engine ready"
        );

        Ok(Self {
            config,
            file_manager,
            log_manager,
            buffer_pool,
        })
    }

    /// Returns true if the database directory did not exist before `open`.
    pub fn is_new(&self) -> bool {
        self.file_manager.is_new_database()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.file_manager
    }

    pub fn log_manager(&self) -> &Arc<LogFile> {
        &self.log_manager
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.buffer_pool
    }
}
