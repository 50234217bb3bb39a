//! On-disk indexes.
//!
//! - [`BTree`] - primary index keyed by [`CompositeKey`]
//! - [`BPlusTree`] - secondary indexes keyed by [`StringKey`]
//! - [`IndexManager`] - the four trees of a store, opened as one unit
//!
//! Both tree types share one paged implementation: values live in leaves,
//! leaves form a doubly linked chain in key order, and inserts split full
//! nodes on the way down.

mod bplus_tree;
mod btree;
mod key;
mod manager;
mod meta;
mod node;
mod tree;

pub use bplus_tree::BPlusTree;
pub use btree::BTree;
pub use key::{BPlusValue, BTreeValue, CompositeKey, FixedCodec, StringKey};
pub use manager::{
    IndexManager, SecondaryIndex, DRIVER_EMAIL, DRIVER_USERNAME, PRIMARY, VEHICLE_PLATE,
};
pub use node::NodePayload;
pub use tree::TreeShape;
