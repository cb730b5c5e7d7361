use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

use crate::common::{BlockId, FrameId, Lsn, Result, StrataError, TxId, MAX_PIN_WAIT};
use crate::storage::disk::BlockStore;
use crate::storage::page::Page;
use crate::wal::LogManager;

use super::{BufferHandle, FrameHeader};

/// Frame bookkeeping guarded by the pool lock
struct PoolState {
    /// One header per frame, in slot order
    frames: Vec<FrameHeader>,
    /// Number of frames with a zero pin count
    available: usize,
}

impl PoolState {
    fn find_existing(&self, block: &BlockId) -> Option<usize> {
        self.frames.iter().position(|frame| frame.holds(block))
    }

    /// First unpinned frame in slot order. No recency is tracked.
    fn choose_unpinned(&self) -> Option<usize> {
        self.frames.iter().position(|frame| !frame.is_pinned())
    }
}

/// State shared between the manager and the handles it gives out
pub(crate) struct PoolShared {
    /// Pin counts, block assignments, modification state and `available`
    state: Mutex<PoolState>,
    /// Page bytes, one per frame. Only pin holders touch a pinned frame's
    /// page; the pool writes a page only while its frame is unpinned.
    pages: Vec<RwLock<Page>>,
    /// Signalled when a frame's pin count drops to zero
    frame_released: Condvar,
    /// Block store for page I/O
    store: Arc<dyn BlockStore>,
    /// Log forced before any modified page is written
    log: Arc<dyn LogManager>,
}

impl PoolShared {
    pub(crate) fn page(&self, frame_id: FrameId) -> &RwLock<Page> {
        &self.pages[frame_id.as_usize()]
    }

    pub(crate) fn pin_count(&self, frame_id: FrameId) -> u32 {
        self.state.lock().frames[frame_id.as_usize()].pin_count()
    }

    pub(crate) fn modified_by(&self, frame_id: FrameId) -> Option<TxId> {
        self.state.lock().frames[frame_id.as_usize()].modified_by()
    }

    pub(crate) fn set_modified(&self, frame_id: FrameId, tx: TxId, lsn: Option<Lsn>) {
        self.state.lock().frames[frame_id.as_usize()].set_modified(tx, lsn);
    }

    /// Drops one pin. Reaching zero frees the frame and wakes every waiter.
    pub(crate) fn unpin(&self, frame_id: FrameId) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match state.frames[frame_id.as_usize()].unpin() {
            None => warn!(frame = %frame_id, "unpin of a frame that is not pinned"),
            Some(0) => {
                state.available += 1;
                self.frame_released.notify_all();
            }
            Some(_) => {}
        }
    }

    /// Pins `block` if it is resident or an unpinned frame can take it.
    /// Returns None without touching any state when every frame is pinned.
    fn try_to_pin(&self, state: &mut PoolState, block: &BlockId) -> Result<Option<FrameId>> {
        let index = match state.find_existing(block) {
            Some(index) => index,
            None => match state.choose_unpinned() {
                Some(index) => {
                    self.assign_to_block(state, index, block)?;
                    index
                }
                None => return Ok(None),
            },
        };

        let frame = &mut state.frames[index];
        if !frame.is_pinned() {
            state.available -= 1;
        }
        frame.pin();
        Ok(Some(frame.frame_id()))
    }

    /// Loads `block` into the unpinned frame at `index`, writing back the
    /// frame's previous contents first if they were modified.
    fn assign_to_block(&self, state: &mut PoolState, index: usize, block: &BlockId) -> Result<()> {
        let frame = &mut state.frames[index];
        let mut page = self.pages[index].write();

        if let Some(old) = frame.block() {
            debug!(evicted = %old, %block, frame = %frame.frame_id(), "replacing frame contents");
        }
        self.flush_frame(frame, &page)?;
        frame.clear_block();

        page.clear();
        self.store.read(block, &mut page)?;
        frame.assign(block.clone());
        Ok(())
    }

    /// Writes a modified frame to the block store after forcing the log to
    /// its recovery LSN. Clean frames are left alone.
    fn flush_frame(&self, frame: &mut FrameHeader, page: &Page) -> Result<()> {
        if frame.modified_by().is_none() {
            return Ok(());
        }
        if let Some(lsn) = frame.lsn() {
            self.log.flush(lsn)?;
        }
        self.write_frame(frame, page)
    }

    /// Writes a modified frame without touching the log. The caller has
    /// already forced the log past the frame's LSN.
    fn write_frame(&self, frame: &mut FrameHeader, page: &Page) -> Result<()> {
        let Some(tx) = frame.modified_by() else {
            return Ok(());
        };

        if let Some(block) = frame.block() {
            self.store.write(block, page)?;
            debug!(%block, %tx, lsn = ?frame.lsn(), "flushed frame");
        }

        frame.clear_modified();
        Ok(())
    }
}

/// BufferPoolManager maps blocks onto a fixed set of in-memory frames.
///
/// Callers `pin` a block to get a [`BufferHandle`], work on its page, record
/// the modifying transaction with [`BufferHandle::set_modified`] and finally
/// `unpin` the handle. At commit, `flush_all` writes every frame a
/// transaction modified, forcing the log first.
///
/// All frame bookkeeping sits behind one lock, so replacement always sees a
/// consistent view of every frame. When all frames are pinned, `pin` waits
/// up to the configured bound and then fails with
/// [`StrataError::BufferPoolExhausted`].
pub struct BufferPoolManager {
    /// Number of frames in the buffer pool
    capacity: usize,
    /// Longest time `pin` waits for a frame
    max_wait: Duration,
    /// Shared state
    shared: Arc<PoolShared>,
}

impl BufferPoolManager {
    /// Creates a BufferPoolManager with `capacity` frames and the default
    /// pin wait.
    pub fn new(capacity: usize, store: Arc<dyn BlockStore>, log: Arc<dyn LogManager>) -> Self {
        Self::with_max_wait(capacity, store, log, MAX_PIN_WAIT)
    }

    /// Creates a BufferPoolManager whose `pin` gives up after `max_wait`.
    pub fn with_max_wait(
        capacity: usize,
        store: Arc<dyn BlockStore>,
        log: Arc<dyn LogManager>,
        max_wait: Duration,
    ) -> Self {
        let block_size = store.block_size();
        let frames = (0..capacity)
            .map(|i| FrameHeader::new(FrameId::new(i as u32)))
            .collect();
        let pages = (0..capacity)
            .map(|_| RwLock::new(Page::new(block_size)))
            .collect();

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                frames,
                available: capacity,
            }),
            pages,
            frame_released: Condvar::new(),
            store,
            log,
        });

        Self {
            capacity,
            max_wait,
            shared,
        }
    }

    /// Pins `block` to a frame, loading it from the block store if needed.
    ///
    /// Blocks while every frame is pinned, re-checking each time another
    /// caller releases a frame. Fails with `BufferPoolExhausted` if no frame
    /// frees up within the pool's wait bound; in that case nothing changes.
    pub fn pin(&self, block: &BlockId) -> Result<BufferHandle> {
        let deadline = Instant::now() + self.max_wait;
        let mut state = self.shared.state.lock();

        loop {
            if let Some(frame_id) = self.shared.try_to_pin(&mut state, block)? {
                debug!(%block, frame = %frame_id, "pinned block");
                return Ok(BufferHandle::new(
                    Arc::clone(&self.shared),
                    frame_id,
                    block.clone(),
                ));
            }

            if Instant::now() >= deadline {
                warn!(%block, waited = ?self.max_wait, "buffer pool exhausted");
                return Err(StrataError::BufferPoolExhausted {
                    block: block.clone(),
                    waited: self.max_wait,
                });
            }

            debug!(%block, "waiting for an unpinned frame");
            self.shared.frame_released.wait_until(&mut state, deadline);
        }
    }

    /// Releases a pin obtained from `pin`. Dropping the handle has the same
    /// effect.
    pub fn unpin(&self, handle: BufferHandle) {
        drop(handle);
    }

    /// Writes every frame modified by `tx`, after forcing the log up to the
    /// highest recovery LSN among them.
    ///
    /// Frames are flushed one by one. If a write fails, frames flushed
    /// before it stay clean and are not written again on retry. The caller
    /// must not hold a page guard on any frame `tx` modified.
    pub fn flush_all(&self, tx: TxId) -> Result<()> {
        let mut state = self.shared.state.lock();

        // One log force covers every frame of the transaction.
        let mut forced = state
            .frames
            .iter()
            .filter(|frame| frame.modified_by() == Some(tx))
            .filter_map(FrameHeader::lsn)
            .max();
        if let Some(lsn) = forced {
            self.shared.log.flush(lsn)?;
        }

        let mut index = 0;
        while index < state.frames.len() {
            if state.frames[index].modified_by() != Some(tx) {
                index += 1;
                continue;
            }

            let page = match self.shared.pages[index].try_read() {
                Some(page) => page,
                None => {
                    // A pin holder is writing the page. Wait for it with the
                    // pool unlocked, then look at the frame again.
                    MutexGuard::unlocked(&mut state, || drop(self.shared.pages[index].read()));
                    continue;
                }
            };

            // The frame may have been modified again while the pool was
            // unlocked.
            if let Some(lsn) = state.frames[index].lsn() {
                if forced.map_or(true, |forced| lsn > forced) {
                    self.shared.log.flush(lsn)?;
                    forced = Some(lsn);
                }
            }

            self.shared.write_frame(&mut state.frames[index], &page)?;
            index += 1;
        }

        Ok(())
    }

    /// Returns the number of unpinned frames.
    pub fn available(&self) -> usize {
        self.shared.state.lock().available
    }

    /// Returns the number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the pin wait bound.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Returns the pin count of the frame holding `block`, or None if the
    /// block is not resident.
    pub fn pin_count(&self, block: &BlockId) -> Option<u32> {
        let state = self.shared.state.lock();
        state
            .find_existing(block)
            .map(|index| state.frames[index].pin_count())
    }

    /// Returns the block store the pool reads from and writes to.
    pub fn block_store(&self) -> &Arc<dyn BlockStore> {
        &self.shared.store
    }
}
