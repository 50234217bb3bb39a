//! Tree node page layout.
//!
//! # Layout
//! ```text
//! Offset              Size              Field
//! ------              ----              -----
//! 0                   5                 PageHeader (TreeLeaf | TreeInternal)
//! 5                   2                 key_count
//! 7                   2                 level (0 = leaf)
//! 9                   4                 next leaf (PageId::INVALID if none)
//! 13                  4                 prev leaf
//! 17                  MAX_KEYS * K      keys
//! 17 + MAX_KEYS * K   ...               children (u32 x MAX_KEYS+1) or values (V x MAX_KEYS)
//! ```
//! Unused key and payload slots are zero.

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::key::FixedCodec;
use super::tree::TreeKind;

const OFFSET_KEY_COUNT: usize = PageHeader::SIZE;
const OFFSET_KEYS: usize = OFFSET_KEY_COUNT + 2 + 2 + 4 + 4;

/// Bytes a node with `max_keys` keys of `key_size` and values of
/// `value_size` occupies.
pub(crate) const fn node_size(max_keys: usize, key_size: usize, value_size: usize) -> usize {
    let children = (max_keys + 1) * 4;
    let values = max_keys * value_size;
    let payload = if children > values { children } else { values };
    OFFSET_KEYS + max_keys * key_size + payload
}

/// Whether nodes of tree kind `T` fit in one page.
pub(crate) const fn fits_in_page<T: TreeKind>() -> bool {
    node_size(
        T::MAX_KEYS,
        <T::Key as FixedCodec>::SIZE,
        <T::Value as FixedCodec>::SIZE,
    ) <= PAGE_SIZE
}

/// What a node holds besides its keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePayload<V> {
    /// `key_count + 1` child pages.
    Internal(Vec<PageId>),
    /// One value per key.
    Leaf(Vec<V>),
}

/// A decoded tree node.
///
/// Nodes are decoded into owned values, modified, and encoded back; no
/// page lock is held while a node is being worked on.
pub(crate) struct Node<T: TreeKind> {
    pub keys: Vec<T::Key>,
    pub payload: NodePayload<T::Value>,
    /// Distance from the leaves; 0 for a leaf.
    pub level: u16,
    pub next: PageId,
    pub prev: PageId,
}

impl<T: TreeKind> Node<T> {
    pub fn empty_leaf() -> Self {
        Self {
            keys: Vec::with_capacity(T::MAX_KEYS),
            payload: NodePayload::Leaf(Vec::with_capacity(T::MAX_KEYS)),
            level: 0,
            next: PageId::INVALID,
            prev: PageId::INVALID,
        }
    }

    /// Internal node with a single separator between two children.
    pub fn new_root(level: u16, separator: T::Key, left: PageId, right: PageId) -> Self {
        Self {
            keys: vec![separator],
            payload: NodePayload::Internal(vec![left, right]),
            level,
            next: PageId::INVALID,
            prev: PageId::INVALID,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.payload, NodePayload::Leaf(_))
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.keys.len() >= T::MAX_KEYS
    }

    /// Children of an internal node; empty for a leaf.
    pub fn children(&self) -> &[PageId] {
        match &self.payload {
            NodePayload::Internal(children) => children,
            NodePayload::Leaf(_) => &[],
        }
    }

    /// Values of a leaf; empty for an internal node.
    pub fn values(&self) -> &[T::Value] {
        match &self.payload {
            NodePayload::Leaf(values) => values,
            NodePayload::Internal(_) => &[],
        }
    }

    /// Number of keys strictly less than `key`.
    #[inline]
    pub fn lower_bound(&self, key: &T::Key) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// Number of keys less than or equal to `key`.
    #[inline]
    pub fn upper_bound(&self, key: &T::Key) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Insert into a leaf after any equal keys.
    pub fn insert_entry(&mut self, key: T::Key, value: T::Value) {
        let pos = self.upper_bound(&key);
        if let NodePayload::Leaf(values) = &mut self.payload {
            self.keys.insert(pos, key);
            values.insert(pos, value);
        }
    }

    /// Record that child `idx` was split into itself and `right`.
    pub fn insert_separator(&mut self, idx: usize, separator: T::Key, right: PageId) {
        if let NodePayload::Internal(children) = &mut self.payload {
            self.keys.insert(idx, separator);
            children.insert(idx + 1, right);
        }
    }

    /// Move the upper half of this node into a new node.
    ///
    /// Returns the separator for the parent and the new right sibling.
    /// A leaf keeps its first `MAX_KEYS / 2` entries and the separator is a
    /// copy of the right half's first key. An internal node gives up its
    /// median key to the parent. Leaf chain links are left to the caller.
    pub fn split_off(&mut self) -> (T::Key, Node<T>) {
        let mid = T::MAX_KEYS / 2;
        match &mut self.payload {
            NodePayload::Leaf(values) => {
                let right_keys = self.keys.split_off(mid);
                let right_values = values.split_off(mid);
                let separator = right_keys[0];
                let right = Node {
                    keys: right_keys,
                    payload: NodePayload::Leaf(right_values),
                    level: 0,
                    next: PageId::INVALID,
                    prev: PageId::INVALID,
                };
                (separator, right)
            }
            NodePayload::Internal(children) => {
                let right_keys = self.keys.split_off(mid + 1);
                let right_children = children.split_off(mid + 1);
                let separator = self.keys[mid];
                self.keys.truncate(mid);
                let right = Node {
                    keys: right_keys,
                    payload: NodePayload::Internal(right_children),
                    level: self.level,
                    next: PageId::INVALID,
                    prev: PageId::INVALID,
                };
                (separator, right)
            }
        }
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Serialize into `page`, replacing its contents, and seal it.
    pub fn encode(&self, page: &mut Page) {
        page.reset();
        let buf = page.as_mut_slice();
        let mut w = FieldWriter::at(buf, OFFSET_KEY_COUNT);
        w.put_u16(self.keys.len() as u16);
        w.put_u16(self.level);
        w.put_u32(self.next.0);
        w.put_u32(self.prev.0);

        for key in &self.keys {
            key.encode(&mut w);
        }

        let payload_start = OFFSET_KEYS + T::MAX_KEYS * <T::Key as FixedCodec>::SIZE;
        let mut w = FieldWriter::at(buf, payload_start);
        let page_type = match &self.payload {
            NodePayload::Internal(children) => {
                for child in children {
                    w.put_u32(child.0);
                }
                PageType::TreeInternal
            }
            NodePayload::Leaf(values) => {
                for value in values {
                    value.encode(&mut w);
                }
                PageType::TreeLeaf
            }
        };
        page.seal(page_type);
    }

    /// Decode and validate the node stored in `page`.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` on a checksum or page type mismatch, a
    /// key count above `MAX_KEYS`, an internal node without keys, or a
    /// level that disagrees with the node type.
    pub fn decode(page: &Page, page_id: PageId) -> Result<Self> {
        let page_type = page.validate(page_id, PageType::is_node)?;
        let buf = page.as_slice();

        let mut r = FieldReader::at(buf, OFFSET_KEY_COUNT);
        let key_count = usize::from(r.u16());
        let level = r.u16();
        let next = PageId::new(r.u32());
        let prev = PageId::new(r.u32());

        if key_count > T::MAX_KEYS {
            return Err(Error::corrupt(format!(
                "{page_id} holds {key_count} keys, limit is {}",
                T::MAX_KEYS
            )));
        }
        let is_leaf = page_type == PageType::TreeLeaf;
        if is_leaf != (level == 0) {
            return Err(Error::corrupt(format!(
                "{page_id} is a {page_type:?} at level {level}"
            )));
        }
        if !is_leaf && key_count == 0 {
            return Err(Error::corrupt(format!("{page_id} is an internal node without keys")));
        }

        let keys = (0..key_count)
            .map(|_| T::Key::decode(&mut r))
            .collect::<Result<Vec<_>>>()?;

        let payload_start = OFFSET_KEYS + T::MAX_KEYS * <T::Key as FixedCodec>::SIZE;
        let mut r = FieldReader::at(buf, payload_start);
        let payload = if is_leaf {
            let values = (0..key_count)
                .map(|_| T::Value::decode(&mut r))
                .collect::<Result<Vec<_>>>()?;
            NodePayload::Leaf(values)
        } else {
            NodePayload::Internal((0..=key_count).map(|_| PageId::new(r.u32())).collect())
        };

        Ok(Self {
            keys,
            payload,
            level,
            next,
            prev,
        })
    }
}
