use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::common::{BlockId, Result, StrataError, TEMP_FILE_PREFIX};
use crate::storage::page::Page;

use super::BlockStore;

/// FileManager stores every database file in a single directory and maps
/// each block to `number * block_size` within its file.
///
/// File handles are opened on first use and cached until the manager is
/// dropped. Each handle has its own lock, held for a single seek plus
/// transfer, so I/O on different files never serializes.
pub struct FileManager {
    /// Directory holding the database files
    db_dir: PathBuf,
    /// Size of each block in bytes
    block_size: usize,
    /// Whether the directory was created when the manager started
    is_new: bool,
    /// Open handles keyed by file name
    open_files: Mutex<HashMap<String, Arc<Mutex<File>>>>,
    /// Number of block reads performed
    num_reads: AtomicU64,
    /// Number of block writes performed (appends included)
    num_writes: AtomicU64,
}

impl FileManager {
    /// Opens the database directory, creating it if missing, and deletes
    /// any leftover temporary table files.
    pub fn new<P: AsRef<Path>>(db_dir: P, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(StrataError::InvalidConfig(
                "block size must be positive".to_string(),
            ));
        }
        let db_dir = db_dir.as_ref().to_path_buf();

        let is_new = !db_dir.is_dir();
        if is_new {
            fs::create_dir_all(&db_dir).map_err(|e| {
                StrataError::storage(format!("database directory {}", db_dir.display()), e)
            })?;
            info!(dir = %db_dir.display(), "created database directory");
        }

        let purged = Self::purge_temp_files(&db_dir)?;
        if purged > 0 {
            info!(dir = %db_dir.display(), purged, "removed temporary table files");
        }

        Ok(Self {
            db_dir,
            block_size,
            is_new,
            open_files: Mutex::new(HashMap::new()),
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        })
    }

    /// Returns the database directory.
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Returns the number of block reads performed.
    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of block writes performed.
    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Deletes every regular file in `dir` whose name starts with the
    /// temporary table prefix. Any failure is fatal for startup.
    fn purge_temp_files(dir: &Path) -> Result<usize> {
        let cleanup_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StrataError::StartupCleanup { path, source }
        };

        let mut purged = 0;
        for entry in fs::read_dir(dir).map_err(cleanup_err(dir))? {
            let entry = entry.map_err(cleanup_err(dir))?;
            if !entry.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX) {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type().map_err(cleanup_err(&path))?;
            if !file_type.is_file() {
                continue;
            }

            fs::remove_file(&path).map_err(cleanup_err(&path))?;
            debug!(file = %path.display(), "removed temporary file");
            purged += 1;
        }

        Ok(purged)
    }

    /// Returns the cached handle for `file_name`, opening it on first use.
    fn file(&self, file_name: &str) -> Result<Arc<Mutex<File>>> {
        let mut open_files = self.open_files.lock();
        if let Some(file) = open_files.get(file_name) {
            return Ok(Arc::clone(file));
        }

        let path = self.db_dir.join(file_name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file = Arc::new(Mutex::new(file));
        open_files.insert(file_name.to_string(), Arc::clone(&file));
        Ok(file)
    }

    fn block_offset(&self, number: u32) -> u64 {
        number as u64 * self.block_size as u64
    }

    fn blocks_in(&self, file: &File) -> Result<u32> {
        Ok((file.metadata()?.len() / self.block_size as u64) as u32)
    }
}

impl BlockStore for FileManager {
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        let file = self.file(block.file_name())?;
        let offset = self.block_offset(block.number());
        let io_err = |e| StrataError::storage(format!("read of {block}"), e);

        let mut file = file.lock();
        file.seek(SeekFrom::Start(offset)).map_err(io_err)?;

        // Stop at end of file; the rest of the page keeps its contents.
        let buf = page.contents_mut();
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            }
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        let file = self.file(block.file_name())?;
        let offset = self.block_offset(block.number());
        let io_err = |e| StrataError::storage(format!("write of {block}"), e);

        let mut file = file.lock();
        file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
        file.write_all(page.contents()).map_err(io_err)?;
        file.sync_data().map_err(io_err)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn append(&self, file_name: &str) -> Result<BlockId> {
        let file = self.file(file_name)?;

        // Length and write happen under one lock so concurrent appends to
        // the same file get distinct block numbers.
        let mut file = file.lock();
        let block = BlockId::new(file_name, self.blocks_in(&file)?);
        let io_err = |e| StrataError::storage(format!("append of {block}"), e);

        let zeros = vec![0u8; self.block_size];
        file.seek(SeekFrom::Start(self.block_offset(block.number())))
            .map_err(io_err)?;
        file.write_all(&zeros).map_err(io_err)?;
        file.sync_data().map_err(io_err)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        debug!(%block, "appended block");
        Ok(block)
    }

    fn length_in_blocks(&self, file_name: &str) -> Result<u32> {
        let cached = self.open_files.lock().get(file_name).cloned();
        if let Some(file) = cached {
            let file = file.lock();
            return self.blocks_in(&file);
        }

        // Do not create the file just to learn that it is empty.
        match fs::metadata(self.db_dir.join(file_name)) {
            Ok(metadata) => Ok((metadata.len() / self.block_size as u64) as u32),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn is_new_database(&self) -> bool {
        self.is_new
    }

    fn block_size(&self) -> usize {
        self.block_size
    }
}

impl Drop for FileManager {
    fn drop(&mut self) {
        for file in self.open_files.get_mut().values() {
            let _ = file.lock().sync_all();
        }
    }
}
