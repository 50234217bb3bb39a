//! Tree metadata page (page 0 of every index file).
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       5     PageHeader (TreeMeta)
//! 5       8     magic ("BTREE001" / "BPLUS001")
//! 13      4     format version
//! 17      4     root page
//! 21      4     left-most leaf page
//! 25      8     total entries
//! 33      4     height (root splits so far; 0 = root is a leaf)
//! 37      64    index name, NUL padded
//! ```

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

const OFFSET_MAGIC: usize = PageHeader::SIZE;
const NAME_LEN: usize = 64;

/// Decoded contents of a metadata page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TreeMeta {
    pub root: PageId,
    pub leftmost_leaf: PageId,
    pub total_entries: u64,
    pub height: u32,
    pub name: String,
}

impl TreeMeta {
    pub const VERSION: u32 = 1;

    /// Metadata of a tree whose root is the empty leaf `root`.
    pub fn new(root: PageId, name: &str) -> Self {
        Self {
            root,
            leftmost_leaf: root,
            total_entries: 0,
            height: 0,
            name: name.to_string(),
        }
    }

    pub fn encode(&self, magic: &[u8; 8], page: &mut Page) {
        page.reset();
        let mut w = FieldWriter::at(page.as_mut_slice(), OFFSET_MAGIC);
        w.put_bytes(magic);
        w.put_u32(Self::VERSION);
        w.put_u32(self.root.0);
        w.put_u32(self.leftmost_leaf.0);
        w.put_u64(self.total_entries);
        w.put_u32(self.height);
        w.put_str(&self.name, NAME_LEN);
        page.seal(PageType::TreeMeta);
    }

    /// # Errors
    /// Returns `Error::CorruptFile` if the checksum, page type, magic tag or
    /// version does not match.
    pub fn decode(page: &Page, magic: &[u8; 8]) -> Result<Self> {
        page.validate(PageId::META, |t| t == PageType::TreeMeta)?;

        let mut r = FieldReader::at(page.as_slice(), OFFSET_MAGIC);
        let found: [u8; 8] = r.bytes();
        if &found != magic {
            return Err(Error::corrupt(format!(
                "bad magic {:?}, expected {:?}",
                String::from_utf8_lossy(&found),
                String::from_utf8_lossy(magic)
            )));
        }
        let version = r.u32();
        if version != Self::VERSION {
            return Err(Error::corrupt(format!("unsupported index version {version}")));
        }

        Ok(Self {
            root: PageId::new(r.u32()),
            leftmost_leaf: PageId::new(r.u32()),
            total_entries: r.u64(),
            height: r.u32(),
            name: r.str(NAME_LEN),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: [u8; 8] = *b"TEST0001";

    #[test]
    fn test_roundtrip() {
        let meta = TreeMeta {
            root: PageId::new(12),
            leftmost_leaf: PageId::new(1),
            total_entries: 1000,
            height: 3,
            name: "vehicle_plate".into(),
        };
        let mut page = Page::new();
        meta.encode(&MAGIC, &mut page);

        assert_eq!(&page.as_slice()[5..13], b"TEST0001");
        assert_eq!(TreeMeta::decode(&page, &MAGIC).unwrap(), meta);
    }

    #[test]
    fn test_wrong_magic() {
        let mut page = Page::new();
        TreeMeta::new(PageId::new(1), "primary").encode(&MAGIC, &mut page);

        let err = TreeMeta::decode(&page, b"BPLUS001").unwrap_err();
        assert!(err.to_string().contains("bad magic"), "{err}");
    }

    #[test]
    fn test_long_name_is_truncated() {
        let mut page = Page::new();
        TreeMeta::new(PageId::new(1), &"n".repeat(100)).encode(&MAGIC, &mut page);

        let meta = TreeMeta::decode(&page, &MAGIC).unwrap();
        assert_eq!(meta.name.len(), NAME_LEN - 1);
    }
}
