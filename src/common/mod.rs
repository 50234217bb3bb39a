//! Common types and utilities shared across FleetDB.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`StoreConfig`](config::StoreConfig)
//! - Error types
//! - Identifiers (PageId, FrameId, EntityKind)
//! - The little-endian field codec used by every on-disk layout

pub mod bytes;
pub mod config;
mod entity_kind;
pub mod error;
mod frame_id;
mod page_id;

pub use entity_kind::EntityKind;
pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::PageId;
