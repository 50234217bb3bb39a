//! Primary index: composite-key B-Tree over heap record locations.

use std::path::Path;

use crate::buffer::CacheStats;
use crate::common::config::BTREE_MAX_KEYS;
use crate::common::Result;

use super::key::{BTreeValue, CompositeKey};
use super::node::fits_in_page;
use super::tree::{PagedTree, TreeKind, TreeShape};

/// Order-5 tree family: 9 composite keys per node.
pub(crate) struct CompositeTree;

impl TreeKind for CompositeTree {
    type Key = CompositeKey;
    type Value = BTreeValue;
    const MAGIC: [u8; 8] = *b"BTREE001";
    const MAX_KEYS: usize = BTREE_MAX_KEYS;
    const LABEL: &'static str = "btree";
}

const _: () = assert!(fits_in_page::<CompositeTree>());

/// On-disk B-Tree keyed by [`CompositeKey`].
///
/// Equal keys are not rejected: a second insert of the same key adds a
/// second entry, and [`search`](Self::search) returns the first one.
///
/// # Example
/// ```
/// use fleetdb::index::BTreeValue;
/// use fleetdb::{BTree, CompositeKey, EntityKind};
///
/// let dir = tempfile::tempdir().unwrap();
/// let tree = BTree::create(dir.path().join("primary.idx"), 16).unwrap();
///
/// let key = CompositeKey::new(EntityKind::Trip, 7, 1_700_000_000, 0);
/// tree.insert(key, BTreeValue::new(4096, 1024)).unwrap();
/// assert_eq!(tree.search(&key).unwrap().map(|v| v.offset), Some(4096));
/// ```
pub struct BTree {
    inner: PagedTree<CompositeTree>,
}

impl BTree {
    /// Name stored in the metadata page.
    pub const NAME: &'static str = "primary";

    /// Create a new tree file, replacing any file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, cache_pages: usize) -> Result<Self> {
        Ok(Self {
            inner: PagedTree::create(path.as_ref(), Self::NAME, cache_pages)?,
        })
    }

    /// Open an existing tree file.
    ///
    /// # Errors
    /// `Error::CorruptFile` if the file is not a B-Tree index.
    pub fn open<P: AsRef<Path>>(path: P, cache_pages: usize) -> Result<Self> {
        Ok(Self {
            inner: PagedTree::open(path.as_ref(), cache_pages)?,
        })
    }

    pub fn insert(&self, key: CompositeKey, value: BTreeValue) -> Result<()> {
        self.inner.insert(key, value)
    }

    pub fn search(&self, key: &CompositeKey) -> Result<Option<BTreeValue>> {
        self.inner.search(key)
    }

    /// Entries with `low <= key <= high`, ascending.
    pub fn range_query(
        &self,
        low: &CompositeKey,
        high: &CompositeKey,
    ) -> Result<Vec<(CompositeKey, BTreeValue)>> {
        self.inner.range(low, high)
    }

    pub fn scan_all(&self) -> Result<Vec<(CompositeKey, BTreeValue)>> {
        self.inner.scan_all()
    }

    pub fn verify(&self) -> Result<TreeShape> {
        self.inner.verify()
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    pub fn total_records(&self) -> u64 {
        self.inner.total_entries()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}
