//! Heap store header page (first page of the database file).
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       5     PageHeader (HeapHeader)
//! 5       8     magic "SDMDB001"
//! 13      4     format version
//! 17      8     total file size
//! 25      8     created time (unix seconds)
//! 33      8     last modified time
//! 41      64    creator, NUL padded
//! 105     7*24  table directory, one entry per EntityKind:
//!                 offset u64, capacity u32, record size u32, next id u64
//! ```
//! Table regions start right after this page and are laid out back to back
//! in [`EntityKind::ALL`] order.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::config::{TableCapacities, PAGE_SIZE};
use crate::common::{EntityKind, Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

pub(crate) const MAGIC: [u8; 8] = *b"SDMDB001";
const OFFSET_MAGIC: usize = PageHeader::SIZE;
const CREATOR_LEN: usize = 64;
const CREATOR: &str = concat!("fleetdb ", env!("CARGO_PKG_VERSION"));

/// Where one record kind's slot array lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInfo {
    /// Absolute byte offset of slot 0.
    pub offset: u64,
    pub capacity: u32,
    pub record_size: u32,
    /// Next id handed out by `allocate_id`. Starts at 1.
    pub next_id: u64,
}

impl TableInfo {
    /// Byte offset of slot `index`.
    #[inline]
    pub fn slot_offset(&self, index: u32) -> u64 {
        self.offset + u64::from(index) * u64::from(self.record_size)
    }

    /// Bytes covered by the whole table.
    #[inline]
    pub fn region_len(&self) -> u64 {
        u64::from(self.capacity) * u64::from(self.record_size)
    }

    /// Slot number of the slot starting at `offset`, if it is one.
    pub fn slot_index(&self, offset: u64) -> Option<u32> {
        let rel = offset.checked_sub(self.offset)?;
        let size = u64::from(self.record_size);
        if rel % size != 0 {
            return None;
        }
        let index = u32::try_from(rel / size).ok()?;
        (index < self.capacity).then_some(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeapHeader {
    pub version: u32,
    pub total_size: u64,
    pub created_time: u64,
    pub last_modified: u64,
    pub creator: String,
    pub tables: [TableInfo; 7],
}

impl HeapHeader {
    pub const VERSION: u32 = 0x0001_0000;

    /// Lay out the tables for `capacities` right after the header page.
    pub fn new(capacities: &TableCapacities) -> Self {
        let now = unix_now();
        let mut offset = PAGE_SIZE as u64;
        let tables = EntityKind::ALL.map(|kind| {
            let table = TableInfo {
                offset,
                capacity: capacities.get(kind),
                record_size: kind.slot_size(),
                next_id: 1,
            };
            offset += table.region_len();
            table
        });

        Self {
            version: Self::VERSION,
            total_size: offset,
            created_time: now,
            last_modified: now,
            creator: CREATOR.to_string(),
            tables,
        }
    }

    #[inline]
    pub fn table(&self, kind: EntityKind) -> &TableInfo {
        &self.tables[kind.table_index()]
    }

    #[inline]
    pub fn table_mut(&mut self, kind: EntityKind) -> &mut TableInfo {
        &mut self.tables[kind.table_index()]
    }

    pub fn touch(&mut self) {
        self.last_modified = unix_now();
    }

    pub fn encode(&self, page: &mut Page) {
        page.reset();
        let mut w = FieldWriter::at(page.as_mut_slice(), OFFSET_MAGIC);
        w.put_bytes(&MAGIC);
        w.put_u32(self.version);
        w.put_u64(self.total_size);
        w.put_u64(self.created_time);
        w.put_u64(self.last_modified);
        w.put_str(&self.creator, CREATOR_LEN);
        for table in &self.tables {
            w.put_u64(table.offset);
            w.put_u32(table.capacity);
            w.put_u32(table.record_size);
            w.put_u64(table.next_id);
        }
        page.seal(PageType::HeapHeader);
    }

    /// # Errors
    /// Returns `Error::CorruptFile` on a checksum, magic or layout mismatch.
    pub fn decode(page: &Page) -> Result<Self> {
        page.validate(PageId::META, |t| t == PageType::HeapHeader)?;

        let mut r = FieldReader::at(page.as_slice(), OFFSET_MAGIC);
        let magic: [u8; 8] = r.bytes();
        if magic != MAGIC {
            return Err(Error::corrupt(format!(
                "bad heap magic {:?}",
                String::from_utf8_lossy(&magic)
            )));
        }
        let version = r.u32();
        if version != Self::VERSION {
            return Err(Error::corrupt(format!("unsupported heap version {version:#x}")));
        }
        let total_size = r.u64();
        let created_time = r.u64();
        let last_modified = r.u64();
        let creator = r.str(CREATOR_LEN);
        let tables = [(); 7].map(|_| TableInfo {
            offset: r.u64(),
            capacity: r.u32(),
            record_size: r.u32(),
            next_id: r.u64(),
        });

        let header = Self {
            version,
            total_size,
            created_time,
            last_modified,
            creator,
            tables,
        };
        header.check_layout()?;
        Ok(header)
    }

    /// Tables must be contiguous, in kind order, with the kind's slot size.
    fn check_layout(&self) -> Result<()> {
        let mut expected = PAGE_SIZE as u64;
        for kind in EntityKind::ALL {
            let table = self.table(kind);
            if table.offset != expected || table.record_size != kind.slot_size() {
                return Err(Error::corrupt(format!(
                    "{kind} table at {} (size {}) breaks the layout",
                    table.offset, table.record_size
                )));
            }
            if table.next_id == 0 {
                return Err(Error::corrupt(format!("{kind} table has next id 0")));
            }
            expected += table.region_len();
        }
        if expected != self.total_size {
            return Err(Error::corrupt(format!(
                "tables end at {expected}, header says {}",
                self.total_size
            )));
        }
        Ok(())
    }
}

/// Seconds since the unix epoch; 0 if the clock is before it.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
