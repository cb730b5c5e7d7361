use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{BlockId, FrameId, Lsn, TxId};
use crate::storage::page::Page;

use super::buffer_pool_manager::PoolShared;

/// BufferHandle is one pin on a buffer frame.
///
/// The handle gives access to the frame's page and lets the holder record
/// modifications. The pin is released when the handle is passed to
/// [`BufferPoolManager::unpin`](super::BufferPoolManager::unpin) or dropped.
pub struct BufferHandle {
    /// Pool the frame belongs to
    shared: Arc<PoolShared>,
    /// Frame this handle pins
    frame_id: FrameId,
    /// Block the frame held when it was pinned
    block: BlockId,
}

impl BufferHandle {
    pub(crate) fn new(shared: Arc<PoolShared>, frame_id: FrameId, block: BlockId) -> Self {
        Self {
            shared,
            frame_id,
            block,
        }
    }

    /// Returns the pinned block.
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    /// Returns the frame holding the block.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Locks the page for reading.
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.shared.page(self.frame_id).read()
    }

    /// Locks the page for writing. Callers pair writes with `set_modified`
    /// so the pool knows to flush the page.
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.shared.page(self.frame_id).write()
    }

    /// Records that `tx` modified the page, protected by the log record
    /// `lsn` when there is one.
    pub fn set_modified(&self, tx: TxId, lsn: Option<Lsn>) {
        self.shared.set_modified(self.frame_id, tx, lsn);
    }

    /// Returns the transaction whose modification has not been flushed yet.
    pub fn modifying_tx(&self) -> Option<TxId> {
        self.shared.modified_by(self.frame_id)
    }

    /// Returns the frame's current pin count, this handle included.
    pub fn pin_count(&self) -> u32 {
        self.shared.pin_count(self.frame_id)
    }
}

impl std::fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferHandle")
            .field("frame_id", &self.frame_id)
            .field("block", &self.block)
            .finish()
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        self.shared.unpin(self.frame_id);
    }
}
