use crate::common::{BlockId, Result};
use crate::storage::page::Page;

/// Block-addressable byte storage, one file per table, index or log.
///
/// The buffer pool and the log manager only ever reach the disk through this
/// trait.
pub trait BlockStore: Send + Sync {
    /// Reads `block` into `page`. Bytes past the end of the file keep the
    /// page's prior contents.
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()>;

    /// Writes the whole page to `block` and makes it durable.
    fn write(&self, block: &BlockId, page: &Page) -> Result<()>;

    /// Adds a zero-filled block at the end of `file_name` and returns it.
    fn append(&self, file_name: &str) -> Result<BlockId>;

    /// Returns the number of whole blocks in `file_name`. A missing file has
    /// length zero.
    fn length_in_blocks(&self, file_name: &str) -> Result<u32>;

    /// Returns true if the database directory was created by this process.
    fn is_new_database(&self) -> bool;

    /// Returns the block size in bytes.
    fn block_size(&self) -> usize;
}
