//! Frame - one slot of the page cache.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::page::Page;

/// A cache slot holding one page image.
///
/// Which page a frame holds and how many guards pin it are tracked by the
/// pool under its state lock; the frame itself only carries the bytes and
/// the dirty bit.
pub(crate) struct Frame {
    page: RwLock<Page>,
    dirty: AtomicBool,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            dirty: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    #[inline]
    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clear the dirty bit, returning whether it was set.
    #[inline]
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_bit() {
        let frame = Frame::new();
        assert!(!frame.is_dirty());
        assert!(!frame.take_dirty());

        frame.mark_dirty();
        assert!(frame.is_dirty());
        assert!(frame.take_dirty());
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_page_access() {
        let frame = Frame::new();
        frame.write().as_mut_slice()[7] = 0xAB;
        assert_eq!(frame.read().as_slice()[7], 0xAB);
    }
}
