//! Cache frame handles.

use std::fmt;

/// Slot of a page cache frame; indexes the pool's frame vector directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    /// Every frame of a pool holding `pool_size` pages.
    pub fn all(pool_size: usize) -> impl DoubleEndedIterator<Item = FrameId> {
        (0..pool_size).map(FrameId)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}
