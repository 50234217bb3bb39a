//! Page cache for the index files.
//!
//! Each tree owns one [`BufferPoolManager`] over its page file. Nodes are
//! read and written through pinned guards; pages leave the cache in FIFO
//! order.
//!
//! # Components
//! - [`BufferPoolManager`] - the cache itself
//! - [`PageReadGuard`] / [`PageWriteGuard`] - pinned page access
//! - [`CacheStats`] - hit/miss/eviction counters
//! - [`replacer`] - eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::CacheStats;
