//! Page - the fundamental 4KB unit of tree storage.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// The unit of I/O between a tree file and the page cache. `Page` is not
/// `Clone`: copying 4KB should be explicit, see [`Page::copy_from`].
///
/// # Example
/// ```
/// use fleetdb::{Page, PageType};
///
/// let mut page = Page::new();
/// page.as_mut_slice()[100] = 0xFF;
/// page.seal(PageType::TreeLeaf);
/// assert!(page.verify_checksum());
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite this page with the contents of `other`.
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Stamp the page type and checksum. Call after the body is final.
    pub fn seal(&mut self, page_type: PageType) {
        PageHeader::new(page_type).write_to(&mut self.data);
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }

    /// Check the checksum and that the page type satisfies `accept`.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` naming `page_id` on any mismatch.
    pub fn validate(&self, page_id: PageId, accept: impl Fn(PageType) -> bool) -> Result<PageType> {
        let header = self.header();
        if !accept(header.page_type) {
            return Err(Error::corrupt(format!(
                "{page_id} has unexpected page type {:?}",
                header.page_type
            )));
        }
        if !header.verify_checksum(&self.data) {
            return Err(Error::corrupt(format!("{page_id} failed checksum")));
        }
        Ok(header.page_type)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_seal_and_validate() {
        let mut page = Page::new();
        page.as_mut_slice()[4095] = 0xCD;
        page.seal(PageType::TreeInternal);

        assert_eq!(page.header().page_type, PageType::TreeInternal);
        assert_eq!(
            page.validate(PageId::new(1), PageType::is_node).unwrap(),
            PageType::TreeInternal
        );
    }

    #[test]
    fn test_validate_rejects_wrong_type() {
        let mut page = Page::new();
        page.seal(PageType::HeapHeader);

        let err = page
            .validate(PageId::new(3), |t| t == PageType::TreeMeta)
            .unwrap_err();
        assert!(matches!(err, Error::CorruptFile(_)));
    }

    #[test]
    fn test_validate_rejects_bit_flip() {
        let mut page = Page::new();
        page.seal(PageType::TreeLeaf);
        page.as_mut_slice()[700] ^= 0x01;

        assert!(!page.verify_checksum());
        assert!(page.validate(PageId::new(2), PageType::is_node).is_err());
    }

    #[test]
    fn test_zero_page_is_invalid_type() {
        let page = Page::new();
        assert!(page.validate(PageId::new(1), PageType::is_node).is_err());
    }

    #[test]
    fn test_copy_from_and_reset() {
        let mut a = Page::new();
        a.as_mut_slice()[10] = 0x42;

        let mut b = Page::new();
        b.copy_from(&a);
        assert_eq!(b.as_slice()[10], 0x42);

        b.reset();
        assert_eq!(b.as_slice()[10], 0);
    }
}
