//! Disk Manager - page-granular file I/O for the tree indexes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single page file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ (meta)  │ (root)  │         │         │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// # Thread Safety
/// `DiskManager` needs `&mut self` for every I/O because each read or write
/// is a seek followed by a transfer on one file handle. The owning
/// [`BufferPoolManager`](crate::BufferPoolManager) keeps it behind a mutex so
/// the pair is never interleaved with another thread's seek.
///
/// # Durability
/// Writes reach the OS immediately; [`DiskManager::sync`] forces them to
/// stable storage.
pub struct DiskManager {
    file: File,
    path: PathBuf,
    page_count: u32,
}

impl DiskManager {
    /// Create a page file, truncating any existing file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        debug!(path = %path.display(), "created page file");
        Ok(Self {
            file,
            path,
            page_count: 0,
        })
    }

    /// Open an existing page file.
    ///
    /// # Errors
    /// Returns an I/O error if the file doesn't exist, or `Error::CorruptFile`
    /// if its length is not a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(Error::corrupt(format!(
                "{}: size {file_size} is not a multiple of {PAGE_SIZE}",
                path.display()
            )));
        }
        let page_count = u32::try_from(file_size / PAGE_SIZE as u64)
            .map_err(|_| Error::corrupt(format!("{}: too many pages", path.display())))?;

        debug!(path = %path.display(), page_count, "opened page file");
        Ok(Self {
            file,
            path,
            page_count,
        })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_bounds(page_id)?;

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_bounds(page_id)?;

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        self.file.write_all(page.as_slice())?;

        Ok(())
    }

    /// Append a zeroed page to the file and return its id.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count == u32::MAX {
            return Err(Error::corrupt(format!(
                "{}: page id space exhausted",
                self.path.display()
            )));
        }
        let page_id = PageId::new(self.page_count);

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Flush file contents and metadata to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn file_size(&self) -> u64 {
        u64::from(self.page_count) * PAGE_SIZE as u64
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_bounds(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() || page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        Ok(())
    }
}
