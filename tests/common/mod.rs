//! Test doubles that record block store and log calls in one shared order

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use strata::common::{BlockId, Lsn, Result, StrataError};
use strata::storage::disk::BlockStore;
use strata::storage::page::Page;
use strata::wal::LogManager;

pub const TEST_BLOCK_SIZE: usize = 64;

/// One observed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Read(BlockId),
    Write(BlockId),
    LogFlush(Lsn),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// In-memory block store that records every read and write.
pub struct MemoryStore {
    blocks: Mutex<HashMap<BlockId, Vec<u8>>>,
    failing_writes: Mutex<HashSet<BlockId>>,
    events: EventLog,
}

impl MemoryStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
            failing_writes: Mutex::new(HashSet::new()),
            events,
        }
    }

    /// Makes every write of `block` fail until `heal` is called.
    pub fn fail_writes(&self, block: &BlockId) {
        self.failing_writes.lock().insert(block.clone());
    }

    pub fn heal(&self) {
        self.failing_writes.lock().clear();
    }

    pub fn stored(&self, block: &BlockId) -> Option<Vec<u8>> {
        self.blocks.lock().get(block).cloned()
    }
}

impl BlockStore for MemoryStore {
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        self.events.lock().push(Event::Read(block.clone()));
        if let Some(bytes) = self.blocks.lock().get(block) {
            page.contents_mut().copy_from_slice(bytes);
        }
        Ok(())
    }

    fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        if self.failing_writes.lock().contains(block) {
            return Err(StrataError::storage(
                format!("write of {block}"),
                std::io::Error::other("injected failure"),
            ));
        }
        self.events.lock().push(Event::Write(block.clone()));
        self.blocks
            .lock()
            .insert(block.clone(), page.contents().to_vec());
        Ok(())
    }

    fn append(&self, file_name: &str) -> Result<BlockId> {
        let block = BlockId::new(file_name, self.length_in_blocks(file_name)?);
        self.blocks
            .lock()
            .insert(block.clone(), vec![0; TEST_BLOCK_SIZE]);
        Ok(block)
    }

    fn length_in_blocks(&self, file_name: &str) -> Result<u32> {
        let blocks = self.blocks.lock();
        Ok(blocks.keys().filter(|b| b.file_name() == file_name).count() as u32)
    }

    fn is_new_database(&self) -> bool {
        true
    }

    fn block_size(&self) -> usize {
        TEST_BLOCK_SIZE
    }
}

/// Log manager that only records the flush barrier calls.
pub struct RecordingLog {
    events: EventLog,
}

impl RecordingLog {
    pub fn new(events: EventLog) -> Self {
        Self { events }
    }
}

impl LogManager for RecordingLog {
    fn flush(&self, lsn: Lsn) -> Result<()> {
        self.events.lock().push(Event::LogFlush(lsn));
        Ok(())
    }
}

/// Builds a store and a log sharing one event list.
pub fn recording_pair() -> (Arc<MemoryStore>, Arc<RecordingLog>, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    (
        Arc::new(MemoryStore::new(events.clone())),
        Arc::new(RecordingLog::new(events.clone())),
        events,
    )
}
