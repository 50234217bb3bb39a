//! FIFO (first-in, first-out) replacement policy.
//!
//! The page cache evicts in insertion order: a frame's position is fixed
//! when a page is loaded into it and re-accessing the page does not move
//! it. This is deliberately not LRU.

use std::collections::VecDeque;

use crate::common::FrameId;

/// Insertion-order eviction over a fixed number of frames.
///
/// Pinned frames are skipped; a skipped frame keeps its place in line.
pub struct FifoReplacer {
    /// Frames in load order (front = oldest).
    queue: VecDeque<FrameId>,
    /// `queued[f]`: frame `f` currently has a slot in `queue`.
    queued: Vec<bool>,
    /// `evictable[f]`: frame `f` holds a page with pin count 0.
    evictable: Vec<bool>,
    evictable_count: usize,
}

impl FifoReplacer {
    /// Replacer for frames `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            queued: vec![false; capacity],
            evictable: vec![false; capacity],
            evictable_count: 0,
        }
    }

    /// Note that `frame_id` was loaded or accessed.
    ///
    /// Only the first access after a load enqueues the frame.
    pub fn record_access(&mut self, frame_id: FrameId) {
        if !self.queued[frame_id.0] {
            self.queued[frame_id.0] = true;
            self.queue.push_back(frame_id);
        }
    }

    /// Mark a frame as evictable (pin count dropped to 0) or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let slot = &mut self.evictable[frame_id.0];
        if *slot != evictable {
            *slot = evictable;
            if evictable {
                self.evictable_count += 1;
            } else {
                self.evictable_count -= 1;
            }
        }
    }

    /// Remove and return the oldest evictable frame.
    ///
    /// Returns None if every queued frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let pos = self.queue.iter().position(|f| self.evictable[f.0])?;
        let frame_id = self.queue.remove(pos)?;
        self.queued[frame_id.0] = false;
        self.set_evictable(frame_id, false);
        Some(frame_id)
    }

    /// Forget a frame entirely (its page was dropped from the cache).
    pub fn remove(&mut self, frame_id: FrameId) {
        if self.queued[frame_id.0] {
            self.queued[frame_id.0] = false;
            self.queue.retain(|f| *f != frame_id);
        }
        self.set_evictable(frame_id, false);
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable_count
    }
}
