//! Storage layer - page file I/O and page formats.
//!
//! - [`DiskManager`] - Page-granular file I/O for the tree indexes
//! - [`page`] - Page types and layouts
//!
//! The heap store does its own slot-granular I/O, see [`crate::heap`].

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
