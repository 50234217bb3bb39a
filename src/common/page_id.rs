//! Page identifier type.

use std::fmt;

use crate::common::config::PAGE_SIZE;

/// Typed handle to a page inside one page file.
///
/// Tree child pointers and the leaf chain's `next`/`prev` links are stored
/// as `PageId`s rather than raw byte offsets, so a page reference can never
/// be confused with a record id or a heap offset. Page 0 of every tree file
/// is the metadata page; nodes start at page 1.
///
/// # Example
/// ```
/// use fleetdb::PageId;
///
/// let page_id = PageId::new(3);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.offset(), 3 * 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Null link: "no page".
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The metadata page of a tree file.
    pub const META: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is a real page (not the null link).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Byte offset of the page within its file.
    #[inline]
    pub fn offset(&self) -> u64 {
        u64::from(self.0) * PAGE_SIZE as u64
    }

    /// `Some(self)` unless this is the null link.
    #[inline]
    pub fn valid(self) -> Option<PageId> {
        self.is_valid().then_some(self)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(NULL)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_offset() {
        assert_eq!(PageId::META.offset(), 0);
        assert_eq!(PageId::new(1).offset(), 4096);
        assert_eq!(PageId::new(u32::MAX - 1).offset(), (u32::MAX as u64 - 1) * 4096);
    }

    #[test]
    fn test_page_id_null_link() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.valid(), None);
        assert_eq!(PageId::new(7).valid(), Some(PageId::new(7)));
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(NULL)");
    }
}
