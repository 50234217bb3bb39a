//! Paged tree core shared by the primary B-Tree and the string B+-Trees.
//!
//! Both trees keep their entries in leaves linked into a sorted chain and
//! route through internal nodes holding separator keys. Inserts split full
//! nodes on the way down, so a descent never has to climb back up.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::buffer::{BufferPoolManager, CacheStats};
use crate::common::{Error, PageId, Result};
use crate::storage::DiskManager;

use super::key::FixedCodec;
use super::meta::TreeMeta;
use super::node::Node;

/// Parameters of one tree family: key and value types, fanout, file tag.
pub trait TreeKind: Sized + Send + Sync + 'static {
    type Key: FixedCodec + Ord + Copy + Debug + Send + Sync;
    type Value: FixedCodec + Copy + Debug + Send + Sync;

    /// Magic tag at the start of the metadata page.
    const MAGIC: [u8; 8];
    /// Keys per node; a full node is split before descending into it.
    const MAX_KEYS: usize;
    /// Label used in log output.
    const LABEL: &'static str;
}

/// Shape of a tree as found by [`PagedTree::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeShape {
    /// Root splits recorded in the metadata page.
    pub height: u32,
    /// Edges from the root to every leaf.
    pub leaf_depth: u32,
    pub leaf_count: usize,
    pub internal_count: usize,
    pub entries: u64,
    /// Children of the root; 0 while the root is a leaf.
    pub root_fanout: usize,
}

/// A disk-resident tree of kind `T` over one page file.
pub(crate) struct PagedTree<T: TreeKind> {
    pool: BufferPoolManager,
    /// Writers hold this for a whole insert, so readers never see a
    /// half-finished split.
    meta: RwLock<TreeMeta>,
    path: PathBuf,
    _kind: PhantomData<fn() -> T>,
}

impl<T: TreeKind> PagedTree<T> {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new tree file at `path`, replacing any existing file.
    ///
    /// The file starts with the metadata page and an empty root leaf.
    pub fn create(path: &Path, name: &str, cache_pages: usize) -> Result<Self> {
        let pool = BufferPoolManager::new(cache_pages, DiskManager::create(path)?)?;

        let meta_page = pool.new_page()?.page_id();
        debug_assert_eq!(meta_page, PageId::META);

        let root = {
            let mut guard = pool.new_page()?;
            Node::<T>::empty_leaf().encode(&mut guard);
            guard.page_id()
        };

        let tree = Self {
            pool,
            meta: RwLock::new(TreeMeta::new(root, name)),
            path: path.to_path_buf(),
            _kind: PhantomData,
        };
        tree.write_meta(&tree.meta.read())?;
        tree.pool.flush_all_pages()?;

        info!(path = %path.display(), name, kind = T::LABEL, "created index");
        Ok(tree)
    }

    /// Open an existing tree file, validating its metadata page.
    ///
    /// # Errors
    /// Returns an I/O error if the file is missing and `Error::CorruptFile`
    /// if its magic tag, version or checksum is wrong.
    pub fn open(path: &Path, cache_pages: usize) -> Result<Self> {
        let disk = DiskManager::open(path)?;
        let page_count = disk.page_count();
        if page_count < 2 {
            return Err(Error::corrupt(format!(
                "{}: {page_count} pages, not an index file",
                path.display()
            )));
        }
        let pool = BufferPoolManager::new(cache_pages, disk)?;

        let meta = {
            let guard = pool.fetch_page_read(PageId::META)?;
            TreeMeta::decode(&guard, &T::MAGIC)?
        };
        for page in [meta.root, meta.leftmost_leaf] {
            if !page.is_valid() || page.0 >= page_count {
                return Err(Error::corrupt(format!(
                    "{}: metadata points at missing {page}",
                    path.display()
                )));
            }
        }

        info!(
            path = %path.display(),
            name = %meta.name,
            entries = meta.total_entries,
            height = meta.height,
            kind = T::LABEL,
            "opened index"
        );
        Ok(Self {
            pool,
            meta: RwLock::new(meta),
            path: path.to_path_buf(),
            _kind: PhantomData,
        })
    }

    /// Write back every dirty page and sync the file.
    pub fn flush(&self) -> Result<()> {
        let _meta = self.meta.read();
        self.pool.flush_all_pages()
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert an entry. Equal keys are kept side by side, never replaced.
    pub fn insert(&self, key: T::Key, value: T::Value) -> Result<()> {
        let mut meta = self.meta.write();

        let mut root = self.read_node(meta.root)?;
        if root.is_full() {
            let old_root = meta.root;
            let (separator, right) = self.split_child(old_root, &mut root)?;
            let new_root = Node::<T>::new_root(root.level + 1, separator, old_root, right);
            meta.root = self.allocate_node(&new_root)?;
            meta.height += 1;
            debug!(
                name = %meta.name,
                root = %meta.root,
                height = meta.height,
                "index root split"
            );
            root = new_root;
        }

        let mut page_id = meta.root;
        let mut node = root;
        while !node.is_leaf() {
            let idx = node.upper_bound(&key);
            let mut child_id = node.children()[idx];
            let mut child = self.read_node(child_id)?;

            if child.is_full() {
                let (separator, right) = self.split_child(child_id, &mut child)?;
                node.insert_separator(idx, separator, right);
                self.write_node(page_id, &node)?;
                if key >= separator {
                    child_id = right;
                    child = self.read_node(right)?;
                }
            }

            page_id = child_id;
            node = child;
        }

        node.insert_entry(key, value);
        self.write_node(page_id, &node)?;

        meta.total_entries += 1;
        self.write_meta(&meta)?;
        self.pool.write_back_dirty()?;
        Ok(())
    }

    /// Split the full node at `page_id`, writing both halves.
    ///
    /// `node` is left holding the lower half. Returns the separator and the
    /// page of the new upper half.
    fn split_child(&self, page_id: PageId, node: &mut Node<T>) -> Result<(T::Key, PageId)> {
        let (separator, mut right) = node.split_off();

        if node.is_leaf() {
            right.prev = page_id;
            right.next = node.next;
        }
        let right_id = self.allocate_node(&right)?;

        if node.is_leaf() {
            if let Some(neighbour_id) = node.next.valid() {
                let mut neighbour = self.read_node(neighbour_id)?;
                neighbour.prev = right_id;
                self.write_node(neighbour_id, &neighbour)?;
            }
            node.next = right_id;
        }
        self.write_node(page_id, node)?;

        debug!(
            kind = T::LABEL,
            left = %page_id,
            right = %right_id,
            level = node.level,
            "split node"
        );
        Ok((separator, right_id))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Value of the first entry equal to `key`.
    pub fn search(&self, key: &T::Key) -> Result<Option<T::Value>> {
        let meta = self.meta.read();
        let mut cursor = self.seek(meta.root, key)?;

        while let Some((k, v)) = cursor.current() {
            if k >= *key {
                return Ok((k == *key).then_some(v));
            }
            cursor.advance(self)?;
        }
        Ok(None)
    }

    /// Every entry with `low <= key <= high`, in key order.
    pub fn range(&self, low: &T::Key, high: &T::Key) -> Result<Vec<(T::Key, T::Value)>> {
        let mut entries = Vec::new();
        if low > high {
            return Ok(entries);
        }

        let meta = self.meta.read();
        let mut cursor = self.seek(meta.root, low)?;
        while let Some((k, v)) = cursor.current() {
            if k > *high {
                break;
            }
            if k >= *low {
                entries.push((k, v));
            }
            cursor.advance(self)?;
        }
        Ok(entries)
    }

    /// Every entry in key order, following the leaf chain from the left-most
    /// leaf.
    pub fn scan_all(&self) -> Result<Vec<(T::Key, T::Value)>> {
        let meta = self.meta.read();
        let mut entries = Vec::with_capacity(meta.total_entries as usize);
        let mut next = meta.leftmost_leaf.valid();
        while let Some(page_id) = next {
            let leaf = self.read_node(page_id)?;
            entries.extend(leaf.keys.iter().copied().zip(leaf.values().iter().copied()));
            next = leaf.next.valid();
        }
        Ok(entries)
    }

    /// Descend to the leaf where the first key `>= key` would be.
    fn seek(&self, root: PageId, key: &T::Key) -> Result<LeafCursor<T>> {
        let mut page_id = root;
        let mut node = self.read_node(page_id)?;
        while !node.is_leaf() {
            page_id = node.children()[node.lower_bound(key)];
            node = self.read_node(page_id)?;
        }
        let pos = node.lower_bound(key);
        let mut cursor = LeafCursor { leaf: node, pos };
        // every key in this leaf may be smaller; the answer is then further right
        cursor.settle(self)?;
        Ok(cursor)
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Walk the whole tree and check its structure.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` describing the first violation found:
    /// out-of-order keys, an underfull non-root node, a key outside its
    /// parent's separators, leaves at different depths, a broken leaf
    /// chain, or counts that disagree with the metadata page.
    pub fn verify(&self) -> Result<TreeShape> {
        let meta = self.meta.read();
        let mut walk = VerifyWalk {
            leaves: Vec::new(),
            leaf_depth: None,
            shape: TreeShape {
                height: meta.height,
                ..TreeShape::default()
            },
        };
        self.verify_node(meta.root, 0, None, None, true, &mut walk)?;

        let mut shape = walk.shape;
        shape.leaf_depth = walk.leaf_depth.unwrap_or(0);

        if shape.leaf_depth != meta.height {
            return Err(Error::corrupt(format!(
                "leaves at depth {} but metadata height is {}",
                shape.leaf_depth, meta.height
            )));
        }
        if shape.entries != meta.total_entries {
            return Err(Error::corrupt(format!(
                "{} entries in leaves but metadata counts {}",
                shape.entries, meta.total_entries
            )));
        }
        self.verify_leaf_chain(&meta, &walk.leaves)?;

        Ok(shape)
    }

    fn verify_node(
        &self,
        page_id: PageId,
        depth: u32,
        lower: Option<T::Key>,
        upper: Option<T::Key>,
        is_root: bool,
        walk: &mut VerifyWalk,
    ) -> Result<()> {
        let node = self.read_node(page_id)?;

        if node.keys.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(Error::corrupt(format!("{page_id} keys out of order")));
        }
        if !is_root && node.keys.len() < T::MAX_KEYS / 2 {
            return Err(Error::corrupt(format!(
                "{page_id} holds only {} keys",
                node.keys.len()
            )));
        }
        let below = lower.is_some_and(|l| node.keys.first().is_some_and(|k| *k < l));
        let above = upper.is_some_and(|u| node.keys.last().is_some_and(|k| *k > u));
        if below || above {
            return Err(Error::corrupt(format!(
                "{page_id} has keys outside its parent's range"
            )));
        }

        if is_root {
            walk.shape.root_fanout = node.children().len();
        }

        if node.is_leaf() {
            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(Error::corrupt(format!(
                        "{page_id} is a leaf at depth {depth}, others at {expected}"
                    )));
                }
                Some(_) => {}
            }
            walk.shape.leaf_count += 1;
            walk.shape.entries += node.keys.len() as u64;
            walk.leaves.push((page_id, node.prev, node.next));
            return Ok(());
        }

        walk.shape.internal_count += 1;
        for (i, &child) in node.children().iter().enumerate() {
            let child_lower = if i == 0 { lower } else { Some(node.keys[i - 1]) };
            let child_upper = node.keys.get(i).copied().or(upper);
            self.verify_node(child, depth + 1, child_lower, child_upper, false, walk)?;
        }
        Ok(())
    }

    /// Leaves found by the tree walk, left to right, must match the chain.
    fn verify_leaf_chain(&self, meta: &TreeMeta, leaves: &[(PageId, PageId, PageId)]) -> Result<()> {
        let Some(&(first, _, _)) = leaves.first() else {
            return Err(Error::corrupt("tree has no leaves"));
        };
        if meta.leftmost_leaf != first {
            return Err(Error::corrupt(format!(
                "metadata left-most leaf is {}, tree walk starts at {first}",
                meta.leftmost_leaf
            )));
        }

        let mut expected_prev = PageId::INVALID;
        for (i, &(page_id, prev, next)) in leaves.iter().enumerate() {
            let expected_next = leaves.get(i + 1).map_or(PageId::INVALID, |l| l.0);
            if prev != expected_prev || next != expected_next {
                return Err(Error::corrupt(format!("leaf chain broken at {page_id}")));
            }
            expected_prev = page_id;
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn total_entries(&self) -> u64 {
        self.meta.read().total_entries
    }

    pub fn height(&self) -> u32 {
        self.meta.read().height
    }

    pub fn name(&self) -> String {
        self.meta.read().name.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.pool.stats()
    }

    // ========================================================================
    // Page I/O
    // ========================================================================

    fn read_node(&self, page_id: PageId) -> Result<Node<T>> {
        let guard = self.pool.fetch_page_read(page_id)?;
        Node::decode(&guard, page_id)
    }

    fn write_node(&self, page_id: PageId, node: &Node<T>) -> Result<()> {
        let mut guard = self.pool.fetch_page_write(page_id)?;
        node.encode(&mut guard);
        Ok(())
    }

    fn allocate_node(&self, node: &Node<T>) -> Result<PageId> {
        let mut guard = self.pool.new_page()?;
        node.encode(&mut guard);
        Ok(guard.page_id())
    }

    fn write_meta(&self, meta: &TreeMeta) -> Result<()> {
        let mut guard = self.pool.fetch_page_write(PageId::META)?;
        meta.encode(&T::MAGIC, &mut guard);
        Ok(())
    }
}

impl<T: TreeKind> Drop for PagedTree<T> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.flush_all_pages() {
            warn!(path = %self.path.display(), error = %e, "failed to flush index on close");
        }
    }
}

/// Position inside a leaf, able to step across the leaf chain.
struct LeafCursor<T: TreeKind> {
    leaf: Node<T>,
    pos: usize,
}

impl<T: TreeKind> LeafCursor<T> {
    /// Entry under the cursor, `None` once the chain is exhausted.
    fn current(&self) -> Option<(T::Key, T::Value)> {
        let key = *self.leaf.keys.get(self.pos)?;
        let value = *self.leaf.values().get(self.pos)?;
        Some((key, value))
    }

    /// Step to the next entry, crossing into the next leaf when needed.
    fn advance(&mut self, tree: &PagedTree<T>) -> Result<()> {
        self.pos += 1;
        self.settle(tree)
    }

    /// Move off the end of a leaf onto the first entry of the next
    /// non-empty one. At the end of the chain the cursor stays exhausted.
    fn settle(&mut self, tree: &PagedTree<T>) -> Result<()> {
        while self.pos >= self.leaf.keys.len() {
            let Some(next) = self.leaf.next.valid() else {
                return Ok(());
            };
            self.leaf = tree.read_node(next)?;
            self.pos = 0;
        }
        Ok(())
    }
}

struct VerifyWalk {
    /// (page, prev, next) of each leaf in left-to-right order.
    leaves: Vec<(PageId, PageId, PageId)>,
    leaf_depth: Option<u32>,
    shape: TreeShape,
}
