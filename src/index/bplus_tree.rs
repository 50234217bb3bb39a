//! Secondary indexes: string-keyed B+-Trees.

use std::path::Path;

use crate::buffer::CacheStats;
use crate::common::config::BPLUS_MAX_KEYS;
use crate::common::Result;

use super::key::{BPlusValue, StringKey};
use super::node::fits_in_page;
use super::tree::{PagedTree, TreeKind, TreeShape};

/// Order-10 tree family: 19 string keys per node.
pub(crate) struct StringTree;

impl TreeKind for StringTree {
    type Key = StringKey;
    type Value = BPlusValue;
    const MAGIC: [u8; 8] = *b"BPLUS001";
    const MAX_KEYS: usize = BPLUS_MAX_KEYS;
    const LABEL: &'static str = "bplus";
}

const _: () = assert!(fits_in_page::<StringTree>());

/// On-disk B+-Tree mapping a [`StringKey`] to a record id.
///
/// Each instance is one file with its own metadata page, named after the
/// attribute it indexes (`driver_email`, `vehicle_plate`, ...). Values only
/// name a record; resolving it is a second lookup by id.
pub struct BPlusTree {
    inner: PagedTree<StringTree>,
}

impl BPlusTree {
    /// Create a new tree file, replacing any file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, name: &str, cache_pages: usize) -> Result<Self> {
        Ok(Self {
            inner: PagedTree::create(path.as_ref(), name, cache_pages)?,
        })
    }

    /// Open an existing tree file.
    ///
    /// # Errors
    /// `Error::CorruptFile` if the file is not a B+-Tree index.
    pub fn open<P: AsRef<Path>>(path: P, cache_pages: usize) -> Result<Self> {
        Ok(Self {
            inner: PagedTree::open(path.as_ref(), cache_pages)?,
        })
    }

    pub fn insert(&self, key: StringKey, value: BPlusValue) -> Result<()> {
        self.inner.insert(key, value)
    }

    pub fn search(&self, key: &StringKey) -> Result<Option<BPlusValue>> {
        self.inner.search(key)
    }

    /// Entries with `low <= key <= high`, ascending.
    pub fn range(&self, low: &StringKey, high: &StringKey) -> Result<Vec<(StringKey, BPlusValue)>> {
        self.inner.range(low, high)
    }

    /// All entries in key order, read along the leaf chain.
    pub fn scan_all(&self) -> Result<Vec<(StringKey, BPlusValue)>> {
        self.inner.scan_all()
    }

    pub fn verify(&self) -> Result<TreeShape> {
        self.inner.verify()
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    pub fn total_entries(&self) -> u64 {
        self.inner.total_entries()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Index name from the metadata page.
    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EntityKind;
    use tempfile::tempdir;

    #[test]
    fn test_plates_scan_in_order() {
        let dir = tempdir().unwrap();
        let tree = BPlusTree::create(dir.path().join("plate.idx"), "vehicle_plate", 8).unwrap();

        for i in (0..100u64).rev() {
            let plate = format!("LEA-{i:04}");
            tree.insert(StringKey::new(&plate), BPlusValue::new(i, EntityKind::Vehicle))
                .unwrap();
        }

        let scanned = tree.scan_all().unwrap();
        assert_eq!(scanned.len(), 100);
        assert!(scanned.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(scanned[0].1.id, 0);

        let hit = tree.search(&StringKey::new("LEA-0042")).unwrap().unwrap();
        assert_eq!(hit, BPlusValue::new(42, EntityKind::Vehicle));
        assert_eq!(tree.search(&StringKey::new("lea-0042")).unwrap(), None);

        let window = tree
            .range(&StringKey::new("LEA-0010"), &StringKey::new("LEA-0019"))
            .unwrap();
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn test_name_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("username.idx");
        {
            let tree = BPlusTree::create(&path, "driver_username", 4).unwrap();
            tree.insert(StringKey::new("mara"), BPlusValue::new(1, EntityKind::Profile))
                .unwrap();
        }

        let tree = BPlusTree::open(&path, 4).unwrap();
        assert_eq!(tree.name(), "driver_username");
        assert_eq!(tree.total_entries(), 1);
    }
}
