//! FleetDB - the embedded storage engine behind the fleet manager.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     StorageEngine (engine)                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐   ┌────────────────────────────┐  │
//! │  │   HeapStore (heap/)      │   │   IndexManager (index/)    │  │
//! │  │  header page + 7 fixed   │   │  BTree   (composite key)   │  │
//! │  │  slot arrays, one file   │   │  BPlusTree × 3 (strings)   │  │
//! │  └──────────────────────────┘   └────────────────────────────┘  │
//! │                                              ↓                  │
//! │                           ┌────────────────────────────────┐    │
//! │                           │  BufferPoolManager (buffer/)   │    │
//! │                           │  FIFO page cache, write-back   │    │
//! │                           └────────────────────────────────┘    │
//! │                                              ↓                  │
//! │                           ┌────────────────────────────────┐    │
//! │                           │  DiskManager + Page (storage/) │    │
//! │                           └────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, EntityKind, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Page cache used by the tree indexes
//! - [`index`] - On-disk B-Tree / B+-Tree and the index facade
//! - [`heap`] - Fixed-slot record heap
//! - [`engine`] - Heap store and indexes coordinated as one unit
//!
//! # Quick Start
//! ```no_run
//! use fleetdb::{StorageEngine, StoreConfig};
//! use fleetdb::heap::DriverProfile;
//!
//! let engine = StorageEngine::open_or_create(&StoreConfig::default()).unwrap();
//!
//! let mut driver = DriverProfile::new(engine.allocate_id(fleetdb::EntityKind::Profile).unwrap());
//! driver.email = "ana@example.com".into();
//! engine.insert(&driver).unwrap();
//!
//! let found = engine.find_profile_by_email("ana@example.com").unwrap();
//! assert!(found.is_some());
//! ```

pub mod buffer;
pub mod common;
pub mod engine;
pub mod heap;
pub mod index;
pub mod storage;

pub use common::config::{StoreConfig, TableCapacities, PAGE_SIZE};
pub use common::{EntityKind, Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, CacheStats};
pub use engine::{Indexed, StorageEngine};
pub use heap::{HeapStore, Record, SlotLocation};
pub use index::{BPlusTree, BTree, CompositeKey, IndexManager, StringKey, TreeShape};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
