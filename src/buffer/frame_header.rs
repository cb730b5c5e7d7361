use crate::common::{BlockId, FrameId, Lsn, TxId};

/// FrameHeader holds the bookkeeping for a single buffer frame: the block
/// assigned to it, its pin count and its modification state. The page bytes
/// live next to it in the pool.
///
/// Headers are only touched while the pool lock is held.
#[derive(Debug)]
pub struct FrameHeader {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// The block stored in this frame, if any
    block: Option<BlockId>,
    /// Number of outstanding pins on this frame
    pin_count: u32,
    /// Transaction that modified the page since it was last flushed
    modified_by: Option<TxId>,
    /// Latest log record protecting the modification
    lsn: Option<Lsn>,
}

impl FrameHeader {
    /// Creates an empty, unpinned FrameHeader for the given frame ID.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            block: None,
            pin_count: 0,
            modified_by: None,
            lsn: None,
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn block(&self) -> Option<&BlockId> {
        self.block.as_ref()
    }

    /// Returns true if the frame currently holds `block`.
    pub fn holds(&self, block: &BlockId) -> bool {
        self.block.as_ref() == Some(block)
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Increments the pin count and returns the new value.
    pub fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Decrements the pin count and returns the new value.
    /// Returns None if the pin count was already 0.
    pub fn unpin(&mut self) -> Option<u32> {
        if self.pin_count == 0 {
            return None;
        }
        self.pin_count -= 1;
        Some(self.pin_count)
    }

    pub fn modified_by(&self) -> Option<TxId> {
        self.modified_by
    }

    pub fn lsn(&self) -> Option<Lsn> {
        self.lsn
    }

    /// Records that `tx` modified the page. The recovery LSN only moves
    /// forward until the frame is flushed.
    pub fn set_modified(&mut self, tx: TxId, lsn: Option<Lsn>) {
        self.modified_by = Some(tx);
        if let Some(lsn) = lsn {
            self.lsn = Some(self.lsn.map_or(lsn, |current| current.max(lsn)));
        }
    }

    /// Marks the page as matching its durable copy.
    pub fn clear_modified(&mut self) {
        self.modified_by = None;
        self.lsn = None;
    }

    /// Assigns the frame to a new block. Only valid while unpinned and clean.
    pub fn assign(&mut self, block: BlockId) {
        debug_assert!(!self.is_pinned() && self.modified_by.is_none());
        self.block = Some(block);
    }

    /// Detaches the frame from its block.
    pub fn clear_block(&mut self) {
        debug_assert!(!self.is_pinned());
        self.block = None;
    }
}
