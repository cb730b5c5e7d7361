use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{BlockId, Lsn, Result, StrataError, INT_SIZE};
use crate::storage::disk::BlockStore;
use crate::storage::page::Page;

/// Durability barrier consumed by the buffer pool.
pub trait LogManager: Send + Sync {
    /// Returns once every log record up to and including `lsn` is on stable
    /// storage.
    fn flush(&self, lsn: Lsn) -> Result<()>;
}

struct LogState {
    /// In-memory copy of the last block of the log
    page: Page,
    /// Block the page belongs to
    current: BlockId,
    /// LSN handed to the most recent record
    latest_lsn: Lsn,
    /// Highest LSN known to be on disk
    last_saved_lsn: Lsn,
}

/// LogFile is a block-structured write-ahead log stored in one file.
///
/// Log page layout:
///
/// | Field    | Offset   | Size |
/// |----------|----------|------|
/// | boundary | 0        | 4    |
/// | free     | 4        | ..   |
/// | records  | boundary | ..   |
///
/// Records are length-prefixed and fill each block from the end towards the
/// front, so the record at `boundary` is the newest one in the block.
pub struct LogFile {
    store: Arc<dyn BlockStore>,
    log_file: String,
    state: Mutex<LogState>,
}

impl LogFile {
    /// Opens the log, positioning at its last block, or starts a new one.
    pub fn new(store: Arc<dyn BlockStore>, log_file: impl Into<String>) -> Result<Self> {
        let log_file = log_file.into();

        let len = store.length_in_blocks(&log_file)?;
        let (current, page) = if len == 0 {
            Self::start_block(store.as_ref(), &log_file, None)?
        } else {
            let block = BlockId::new(log_file.as_str(), len - 1);
            let mut page = Page::new(store.block_size());
            store.read(&block, &mut page)?;
            // A block appended but never initialized is still all zeros.
            if page.get_int(0)? == 0 {
                page.set_int(0, store.block_size() as i32)?;
            }
            (block, page)
        };

        Ok(Self {
            store,
            log_file,
            state: Mutex::new(LogState {
                page,
                current,
                latest_lsn: 0,
                last_saved_lsn: 0,
            }),
        })
    }

    /// Appends a record to the log and returns its LSN. The record is only
    /// guaranteed durable after a `flush` with that LSN.
    pub fn append(&self, record: &[u8]) -> Result<Lsn> {
        let block_size = self.store.block_size();
        let max = block_size.saturating_sub(2 * INT_SIZE);
        if record.len() > max {
            return Err(StrataError::LogRecordTooLarge {
                size: record.len(),
                max,
            });
        }

        let mut state = self.state.lock();
        let bytes_needed = Page::max_length(record.len());

        let mut boundary = state.page.get_int(0)? as usize;
        if boundary < bytes_needed + INT_SIZE {
            self.write_page(&mut state)?;
            let (current, page) =
                Self::start_block(self.store.as_ref(), &self.log_file, Some(&state.current))?;
            state.current = current;
            state.page = page;
            boundary = block_size;
        }

        let position = boundary - bytes_needed;
        state.page.set_bytes(position, record)?;
        state.page.set_int(0, position as i32)?;
        state.latest_lsn += 1;
        Ok(state.latest_lsn)
    }

    /// Returns the LSN of the most recent record.
    pub fn latest_lsn(&self) -> Lsn {
        self.state.lock().latest_lsn
    }

    /// Returns the highest LSN known to be durable.
    pub fn last_saved_lsn(&self) -> Lsn {
        self.state.lock().last_saved_lsn
    }

    /// Flushes the log and returns every record, newest first.
    pub fn records(&self) -> Result<Vec<Vec<u8>>> {
        let current = {
            let mut state = self.state.lock();
            self.write_page(&mut state)?;
            state.current.clone()
        };

        let block_size = self.store.block_size();
        let mut page = Page::new(block_size);
        let mut records = Vec::new();

        for number in (0..=current.number()).rev() {
            let block = BlockId::new(self.log_file.as_str(), number);
            page.clear();
            self.store.read(&block, &mut page)?;

            let mut position = page.get_int(0)? as usize;
            if position == 0 {
                continue;
            }
            while position < block_size {
                let record = page.get_bytes(position)?;
                position += Page::max_length(record.len());
                records.push(record.to_vec());
            }
        }

        Ok(records)
    }

    fn write_page(&self, state: &mut LogState) -> Result<()> {
        self.store.write(&state.current, &state.page)?;
        state.last_saved_lsn = state.latest_lsn;
        debug!(lsn = state.last_saved_lsn, block = %state.current, "flushed log page");
        Ok(())
    }

    /// Initializes the block after `after` (or block 0) as an empty log
    /// page. A block left behind by an earlier failed attempt is reused.
    /// Nothing in the current state changes unless this succeeds.
    fn start_block(
        store: &dyn BlockStore,
        log_file: &str,
        after: Option<&BlockId>,
    ) -> Result<(BlockId, Page)> {
        let next = after.map_or(0, |block| block.number() + 1);
        let block = if store.length_in_blocks(log_file)? > next {
            BlockId::new(log_file, next)
        } else {
            store.append(log_file)?
        };

        let mut page = Page::new(store.block_size());
        page.set_int(0, store.block_size() as i32)?;
        store.write(&block, &page)?;
        Ok((block, page))
    }
}

impl LogManager for LogFile {
    fn flush(&self, lsn: Lsn) -> Result<()> {
        let mut state = self.state.lock();
        if lsn >= state.last_saved_lsn {
            self.write_page(&mut state)?;
        }
        Ok(())
    }
}
