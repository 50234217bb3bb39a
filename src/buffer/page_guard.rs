//! RAII access to cached pages.
//!
//! A guard pins its page for as long as it lives, so the frame cannot be
//! evicted or reused underneath it. On drop the page lock is released
//! first and the pin second; no thread ever waits on the pool's state lock
//! while holding a page lock.

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Shared access to a cached page.
pub struct PageReadGuard<'a> {
    pool: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: ManuallyDrop<RwLockReadGuard<'a, Page>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        pool: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock: ManuallyDrop::new(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: `lock` is dropped exactly once, here, and never touched again.
        unsafe { ManuallyDrop::drop(&mut self.lock) };
        self.pool.unpin(self.frame_id);
    }
}

/// Exclusive access to a cached page.
///
/// The frame is marked dirty the first time the page is borrowed mutably;
/// a write guard that only reads leaves the page clean.
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: ManuallyDrop<RwLockWriteGuard<'a, Page>>,
    dirtied: bool,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        pool: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock: ManuallyDrop::new(lock),
            dirtied: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Page {
        if !self.dirtied {
            self.dirtied = true;
            self.pool.mark_dirty(self.frame_id);
        }
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: `lock` is dropped exactly once, here, and never touched again.
        unsafe { ManuallyDrop::drop(&mut self.lock) };
        self.pool.unpin(self.frame_id);
    }
}
