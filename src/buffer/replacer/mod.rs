//! Eviction policy for the page cache.
//!
//! - [`FifoReplacer`] - insertion-order eviction

mod fifo;

pub use fifo::FifoReplacer;
