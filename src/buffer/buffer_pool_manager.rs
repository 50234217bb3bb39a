//! Buffer Pool Manager - the page cache in front of one index file.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::buffer::frame::Frame;
use crate::buffer::replacer::FifoReplacer;
use crate::buffer::stats::CacheCounters;
use crate::buffer::{CacheStats, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// A fixed-size page cache with FIFO eviction.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                   BufferPoolManager                      │
/// │  state: Mutex<PoolState>       frames: Vec<Frame>        │
/// │  ┌────────────────────────┐   ┌────────────────────────┐ │
/// │  │ page_table PageId→Fid  │──▶│ [F0] [F1] [F2] ...     │ │
/// │  │ resident / pins        │   │ RwLock<Page> + dirty   │ │
/// │  │ free_list, FIFO queue  │   └────────────────────────┘ │
/// │  └────────────────────────┘   disk: Mutex<DiskManager>   │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// Residency bookkeeping lives behind one mutex, so a page is never loaded
/// into two frames by racing misses. Lock order is state, then page, then
/// disk. Guards release their page lock before taking the state lock to
/// unpin.
///
/// # Durability
/// Dirty pages reach the file on eviction, [`write_back_dirty`] and
/// [`flush_all_pages`]; only the latter also syncs the file.
///
/// [`write_back_dirty`]: BufferPoolManager::write_back_dirty
/// [`flush_all_pages`]: BufferPoolManager::flush_all_pages
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    disk: Mutex<DiskManager>,
    counters: CacheCounters,
}

/// Which page each frame holds, and who is using it.
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    resident: Vec<Option<PageId>>,
    pins: Vec<u32>,
    /// Never-used or emptied frames, taken before anything is evicted.
    free_list: Vec<FrameId>,
    replacer: FifoReplacer,
}

impl PoolState {
    fn install(&mut self, frame_id: FrameId, page_id: PageId) {
        self.page_table.insert(page_id, frame_id);
        self.resident[frame_id.0] = Some(page_id);
        self.pins[frame_id.0] = 1;
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.pins[frame_id.0] += 1;
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
    }
}

impl BufferPoolManager {
    /// Create a cache of `pool_size` frames over `disk_manager`.
    ///
    /// # Errors
    /// Returns `Error::Config` if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Result<Self> {
        if pool_size == 0 {
            return Err(Error::Config("page cache needs at least one frame".into()));
        }

        Ok(Self {
            frames: (0..pool_size).map(|_| Frame::new()).collect(),
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                resident: vec![None; pool_size],
                pins: vec![0; pool_size],
                free_list: FrameId::all(pool_size).rev().collect(),
                replacer: FifoReplacer::new(pool_size),
            }),
            disk: Mutex::new(disk_manager),
            counters: CacheCounters::default(),
        })
    }

    // ========================================================================
    // Page access
    // ========================================================================

    /// Fetch a page for shared access, loading it from disk on a miss.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page is not in the file
    /// - `Error::NoFreeFrames` if every frame is pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.pin_page(page_id)?;
        let lock = self.frames[frame_id.0].read();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for exclusive access, loading it from disk on a miss.
    ///
    /// # Errors
    /// Same as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.pin_page(page_id)?;
        let lock = self.frames[frame_id.0].write();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Append a zeroed page to the file and return it pinned for writing.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - I/O errors from extending the file
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let (frame_id, page_id) = {
            let mut state = self.state.lock();
            let frame_id = self.take_frame(&mut state)?;

            let page_id = match self.disk.lock().allocate_page() {
                Ok(page_id) => page_id,
                Err(e) => {
                    state.free_list.push(frame_id);
                    return Err(e);
                }
            };

            self.frames[frame_id.0].write().reset();
            state.install(frame_id, page_id);
            (frame_id, page_id)
        };

        trace!(%page_id, %frame_id, "allocated page");
        let lock = self.frames[frame_id.0].write();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Write-back
    // ========================================================================

    /// Write every dirty cached page to the file without syncing.
    ///
    /// Pages stay cached. Returns the number of pages written.
    pub fn write_back_dirty(&self) -> Result<usize> {
        // Pin the dirty set so nothing is evicted while unlocked.
        let dirty: Vec<(FrameId, PageId)> = {
            let mut state = self.state.lock();
            let dirty: Vec<(FrameId, PageId)> = state
                .resident
                .iter()
                .enumerate()
                .filter_map(|(i, page)| page.map(|page_id| (FrameId::new(i), page_id)))
                .filter(|(frame_id, _)| self.frames[frame_id.0].is_dirty())
                .collect();
            for &(frame_id, _) in &dirty {
                state.pin(frame_id);
            }
            dirty
        };

        let mut written = 0;
        let mut failure = None;
        for &(frame_id, page_id) in &dirty {
            if failure.is_none() {
                match self.write_frame(frame_id, page_id) {
                    Ok(true) => written += 1,
                    Ok(false) => {}
                    Err(e) => failure = Some(e),
                }
            }
            self.unpin(frame_id);
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Write back all dirty pages and sync the file to stable storage.
    pub fn flush_all_pages(&self) -> Result<()> {
        let written = self.write_back_dirty()?;
        self.disk.lock().sync()?;
        debug!(written, "flushed page cache");
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of frames.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Number of pages in the underlying file.
    pub fn page_count(&self) -> u32 {
        self.disk.lock().page_count()
    }

    /// Number of pages currently held in frames.
    pub fn cached_pages(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Pin count of a cached page, `None` if it is not cached.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state.page_table.get(&page_id).map(|f| state.pins[f.0])
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Pin `page_id` into a frame, reading it from disk if necessary.
    fn pin_page(&self, page_id: PageId) -> Result<FrameId> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.pin(frame_id);
            self.counters.hit();
            return Ok(frame_id);
        }
        self.counters.miss();

        let frame_id = self.take_frame(&mut state)?;
        let loaded = self.disk.lock().read_page(page_id);
        match loaded {
            Ok(page) => self.frames[frame_id.0].write().copy_from(&page),
            Err(e) => {
                state.free_list.push(frame_id);
                return Err(e);
            }
        }
        self.counters.page_read();

        state.install(frame_id, page_id);
        trace!(%page_id, %frame_id, "loaded page");
        Ok(frame_id)
    }

    /// Get an empty frame, evicting the oldest unpinned page if needed.
    fn take_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let Some(victim) = state.resident[frame_id.0] else {
            return Ok(frame_id);
        };

        if let Err(e) = self.write_frame(frame_id, victim) {
            // Leave the victim cached; it is still dirty.
            state.replacer.record_access(frame_id);
            state.replacer.set_evictable(frame_id, true);
            return Err(e);
        }

        state.page_table.remove(&victim);
        state.resident[frame_id.0] = None;
        self.counters.evicted();
        trace!(page_id = %victim, %frame_id, "evicted page");
        Ok(frame_id)
    }

    /// Write one frame to disk if it is dirty. Returns whether it wrote.
    fn write_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<bool> {
        let frame = &self.frames[frame_id.0];
        let page = frame.read();
        if !frame.take_dirty() {
            return Ok(false);
        }
        if let Err(e) = self.disk.lock().write_page(page_id, &page) {
            frame.mark_dirty();
            return Err(e);
        }
        self.counters.page_written();
        Ok(true)
    }

    pub(crate) fn mark_dirty(&self, frame_id: FrameId) {
        self.frames[frame_id.0].mark_dirty();
    }

    /// Drop one pin. Called by guards after releasing the page lock.
    pub(crate) fn unpin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        let pins = &mut state.pins[frame_id.0];
        debug_assert!(*pins > 0, "unpin of unpinned {frame_id}");
        *pins = pins.saturating_sub(1);
        if *pins == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PageType;
    use tempfile::tempdir;

    fn pool(frames: usize) -> (tempfile::TempDir, BufferPoolManager) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("pool.idx")).unwrap();
        (dir, BufferPoolManager::new(frames, dm).unwrap())
    }

    #[test]
    fn test_zero_frames_rejected() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("pool.idx")).unwrap();
        assert!(matches!(
            BufferPoolManager::new(0, dm),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_new_page_and_fetch() {
        let (_dir, pool) = pool(4);

        let page_id = {
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[100] = 0x5A;
            guard.page_id()
        };
        assert_eq!(page_id, PageId::new(0));
        assert_eq!(pool.pin_count(page_id), Some(0));

        let guard = pool.fetch_page_read(page_id).unwrap();
        assert_eq!(guard.as_slice()[100], 0x5A);
        assert_eq!(pool.pin_count(page_id), Some(1));
        drop(guard);

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_fetch_missing_page() {
        let (_dir, pool) = pool(2);
        assert!(matches!(
            pool.fetch_page_read(PageId::new(3)),
            Err(Error::PageNotFound(3))
        ));
        // the frame taken for the failed load is reusable
        for _ in 0..2 {
            pool.new_page().unwrap();
        }
    }

    #[test]
    fn test_no_free_frames_when_all_pinned() {
        let (_dir, pool) = pool(2);
        let _a = pool.new_page().unwrap();
        let _b = pool.new_page().unwrap();

        assert!(matches!(pool.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_fifo_eviction_writes_back() {
        let (_dir, pool) = pool(2);

        for i in 0..3u8 {
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[0] = i + 1;
        }
        // page 0 was loaded first and is gone
        assert_eq!(pool.pin_count(PageId::new(0)), None);
        assert_eq!(pool.stats().evictions, 1);
        assert_eq!(pool.stats().pages_written, 1);

        let guard = pool.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[0], 1);
        assert_eq!(pool.stats().misses, 1);
    }

    #[test]
    fn test_reaccess_does_not_protect_from_eviction() {
        let (_dir, pool) = pool(2);
        drop(pool.new_page().unwrap());
        drop(pool.new_page().unwrap());

        // touch page 0 again; FIFO still evicts it first
        drop(pool.fetch_page_read(PageId::new(0)).unwrap());
        drop(pool.new_page().unwrap());

        assert_eq!(pool.pin_count(PageId::new(0)), None);
        assert_eq!(pool.pin_count(PageId::new(1)), Some(0));
    }

    #[test]
    fn test_read_only_write_guard_stays_clean() {
        let (_dir, pool) = pool(2);
        {
            let mut guard = pool.new_page().unwrap();
            guard.seal(PageType::TreeLeaf);
        }
        assert_eq!(pool.write_back_dirty().unwrap(), 1);

        {
            let guard = pool.fetch_page_write(PageId::new(0)).unwrap();
            assert!(guard.verify_checksum());
        }
        assert_eq!(pool.write_back_dirty().unwrap(), 0);
    }

    #[test]
    fn test_flush_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.idx");

        {
            let pool = BufferPoolManager::new(2, DiskManager::create(&path).unwrap()).unwrap();
            for i in 0..5u8 {
                let mut guard = pool.new_page().unwrap();
                guard.as_mut_slice()[10] = i * 3;
            }
            pool.flush_all_pages().unwrap();
        }

        let pool = BufferPoolManager::new(2, DiskManager::open(&path).unwrap()).unwrap();
        assert_eq!(pool.page_count(), 5);
        for i in 0..5u8 {
            let guard = pool.fetch_page_read(PageId::new(u32::from(i))).unwrap();
            assert_eq!(guard.as_slice()[10], i * 3);
        }
    }

    #[test]
    fn test_concurrent_readers_share_one_frame() {
        use std::sync::Arc;
        use std::thread;

        let (_dir, pool) = pool(4);
        {
            let mut guard = pool.new_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
        }
        pool.flush_all_pages().unwrap();

        let pool = Arc::new(pool);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let guard = pool.fetch_page_read(PageId::new(0)).unwrap();
                        assert_eq!(guard.as_slice()[0], 0x42);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.cached_pages(), 1);
        assert_eq!(pool.pin_count(PageId::new(0)), Some(0));
    }
}
