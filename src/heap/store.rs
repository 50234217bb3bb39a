//! HeapStore - fixed-slot record storage for all seven record kinds.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::common::config::{TableCapacities, PAGE_SIZE};
use crate::common::{EntityKind, Error, Result};
use crate::storage::page::Page;

use super::header::{HeapHeader, TableInfo};
use super::record::{slot_id, Record, SlotLocation};
use super::records::{
    ExpenseCategory, ExpenseRecord, MaintenanceRecord, TripRecord, VehicleInfo,
};

/// Slots read per I/O call while scanning a table.
const SCAN_CHUNK_SLOTS: u32 = 64;

/// Bytes of zeroes written per call while laying out a new file.
const ZERO_FILL_CHUNK: usize = 1 << 20;

/// One file holding a header page followed by one slot array per record kind.
///
/// # File Layout
/// ```text
/// ┌────────┬──────────────┬──────────────┬─────┬────────────────┐
/// │ header │ profiles     │ vehicles     │ ... │ incidents      │
/// │ 4096 B │ cap x 1024 B │ cap x 1024 B │     │ cap x 2048 B   │
/// └────────┴──────────────┴──────────────┴─────┴────────────────┘
/// ```
///
/// Table offsets are computed once by [`HeapStore::create`] and read back
/// from the header on [`HeapStore::open`]. Every table byte is written at
/// create time, so running out of disk shows up there and not on a later
/// insert.
///
/// Lookups by id scan the table linearly. [`StorageEngine`](crate::StorageEngine)
/// resolves ids through the primary index instead and reads slots with
/// [`HeapStore::read_at`].
///
/// # Thread Safety
/// All file access goes through one mutex, so every seek and its transfer
/// happen as a pair. Writes reach the OS before a call returns;
/// [`HeapStore::flush`] forces them to stable storage.
pub struct HeapStore {
    path: PathBuf,
    inner: Mutex<HeapFile>,
}

struct HeapFile {
    file: File,
    header: HeapHeader,
}

/// Live-record count of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub kind: EntityKind,
    pub capacity: u32,
    pub live: u32,
}

/// Snapshot returned by [`HeapStore::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    pub tables: Vec<TableStats>,
    pub file_size: u64,
}

impl HeapStats {
    pub fn live(&self, kind: EntityKind) -> u32 {
        self.tables
            .iter()
            .find(|t| t.kind == kind)
            .map_or(0, |t| t.live)
    }
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            writeln!(f, "{:<12} {:>10} / {}", table.kind, table.live, table.capacity)?;
        }
        write!(f, "file size: {} bytes", self.file_size)
    }
}

impl HeapStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a heap file at `path`, replacing any existing file.
    ///
    /// Every slot starts zeroed, which reads as free for every record kind.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be created or filled.
    pub fn create<P: AsRef<Path>>(path: P, capacities: &TableCapacities) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let header = HeapHeader::new(capacities);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        let mut inner = HeapFile { file, header };
        inner.zero_fill()?;
        inner.write_header()?;
        inner.file.sync_all()?;

        info!(
            path = %path.display(),
            size = inner.header.total_size,
            "created heap store"
        );
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Open an existing heap file.
    ///
    /// # Errors
    /// Returns an I/O error if the file is missing, or `Error::CorruptFile` if
    /// the header is invalid or the file is shorter than its tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let len = file.metadata()?.len();
        if len < PAGE_SIZE as u64 {
            return Err(Error::corrupt(format!(
                "{}: too short for a heap header",
                path.display()
            )));
        }
        let mut page = Page::new();
        file.read_exact(page.as_mut_slice())?;
        let header = HeapHeader::decode(&page)?;
        if len < header.total_size {
            return Err(Error::corrupt(format!(
                "{}: {len} bytes, tables need {}",
                path.display(),
                header.total_size
            )));
        }

        info!(path = %path.display(), size = header.total_size, "opened heap store");
        Ok(Self {
            path,
            inner: Mutex::new(HeapFile { file, header }),
        })
    }

    /// Open `path` if it exists, otherwise create it.
    ///
    /// The flag is true when a new file was created.
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        capacities: &TableCapacities,
    ) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            Ok((Self::open(path)?, false))
        } else {
            Ok((Self::create(path, capacities)?, true))
        }
    }

    /// Force all written data to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store `record` in the first free slot of its table.
    ///
    /// A record id at or past the table's id counter moves the counter past
    /// it, so [`HeapStore::allocate_id`] never hands out a stored id.
    ///
    /// # Errors
    /// - `Error::InvalidRecord` if the record has id 0 or is marked deleted
    /// - `Error::SlotExhausted` if every slot is live; nothing is written
    pub fn insert<R: Record>(&self, record: &R) -> Result<SlotLocation> {
        if record.id() == 0 {
            return Err(Error::InvalidRecord {
                kind: R::KIND,
                reason: "id 0 marks a free slot",
            });
        }
        if !record.is_live() {
            return Err(Error::InvalidRecord {
                kind: R::KIND,
                reason: "record is marked deleted",
            });
        }

        let mut inner = self.inner.lock();
        let free = inner.scan_slots(R::KIND, |index, slot| {
            if R::slot_is_live(slot) {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(index)
            }
        })?;
        let Some(index) = free else {
            return Err(Error::SlotExhausted {
                kind: R::KIND,
                capacity: inner.header.table(R::KIND).capacity,
            });
        };

        let location = inner.write_record(index, record)?;
        let table = inner.header.table_mut(R::KIND);
        if record.id() >= table.next_id {
            // u64::MAX stays as the counter and marks the id space as used up
            table.next_id = record.id().saturating_add(1);
        }
        inner.write_header()?;

        debug!(%location, id = record.id(), "inserted record");
        Ok(location)
    }

    /// Overwrite the live record with `record.id()`.
    ///
    /// Returns `None` if no live record has that id.
    pub fn update<R: Record>(&self, record: &R) -> Result<Option<SlotLocation>> {
        let mut inner = self.inner.lock();
        let Some((index, _)) = inner.find_live::<R>(record.id())? else {
            return Ok(None);
        };
        let location = inner.write_record(index, record)?;
        inner.write_header()?;
        Ok(Some(location))
    }

    /// Flip the liveness sentinel of the live record with `id`.
    ///
    /// Profiles and vehicles keep every other field; the other kinds lose
    /// only their id. Returns `None` if no live record has that id.
    pub fn delete<R: Record>(&self, id: u64) -> Result<Option<SlotLocation>> {
        let mut inner = self.inner.lock();
        let Some((index, mut record)) = inner.find_live::<R>(id)? else {
            return Ok(None);
        };
        record.mark_deleted();
        let location = inner.write_record(index, &record)?;
        inner.write_header()?;

        debug!(%location, id, "deleted record");
        Ok(Some(location))
    }

    /// Hand out the next id for `kind` and persist the counter.
    ///
    /// # Errors
    /// Returns `Error::InvalidRecord` once the counter reaches `u64::MAX`;
    /// that id is never handed out.
    pub fn allocate_id(&self, kind: EntityKind) -> Result<u64> {
        let mut inner = self.inner.lock();
        let table = inner.header.table_mut(kind);
        let id = table.next_id;
        if id == u64::MAX {
            return Err(Error::InvalidRecord {
                kind,
                reason: "id space exhausted",
            });
        }
        table.next_id = id + 1;
        inner.write_header()?;
        Ok(id)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Find the live record with `id` by scanning its table.
    pub fn read<R: Record>(&self, id: u64) -> Result<Option<R>> {
        Ok(self.inner.lock().find_live::<R>(id)?.map(|(_, r)| r))
    }

    /// Location of the live record with `id`, found by scanning.
    pub fn locate<R: Record>(&self, id: u64) -> Result<Option<SlotLocation>> {
        let mut inner = self.inner.lock();
        let found = inner.find_live::<R>(id)?;
        Ok(found.map(|(index, _)| inner.location(R::KIND, index)))
    }

    /// Read the slot starting at byte `offset`.
    ///
    /// Returns `None` if the slot is free.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` if `offset` is not the start of a slot in
    /// `R`'s table.
    pub fn read_at<R: Record>(&self, offset: u64) -> Result<Option<R>> {
        let mut inner = self.inner.lock();
        let table = *inner.header.table(R::KIND);
        if table.slot_index(offset).is_none() {
            return Err(Error::corrupt(format!(
                "offset {offset} is not a {} slot",
                R::KIND
            )));
        }
        let mut slot = vec![0u8; R::SIZE];
        inner.read_exact_at(offset, &mut slot)?;
        Ok(R::slot_is_live(&slot).then(|| R::decode(&slot)))
    }

    /// Every live record of kind `R`, in slot order.
    pub fn scan<R: Record>(&self) -> Result<Vec<R>> {
        self.scan_where(|_: &R| true)
    }

    /// Live records of kind `R` matching `pred`, in slot order.
    pub fn scan_where<R: Record>(&self, mut pred: impl FnMut(&R) -> bool) -> Result<Vec<R>> {
        let mut out = Vec::new();
        self.inner.lock().scan_slots(R::KIND, |_, slot| {
            if R::slot_is_live(slot) {
                let record = R::decode(slot);
                if pred(&record) {
                    out.push(record);
                }
            }
            ControlFlow::<()>::Continue(())
        })?;
        Ok(out)
    }

    /// Every live record of kind `R` with its location, in slot order.
    pub fn scan_located<R: Record>(&self) -> Result<Vec<(SlotLocation, R)>> {
        let mut inner = self.inner.lock();
        let table = *inner.header.table(R::KIND);
        let mut out = Vec::new();
        inner.scan_slots(R::KIND, |index, slot| {
            if R::slot_is_live(slot) {
                let location = SlotLocation {
                    kind: R::KIND,
                    index,
                    offset: table.slot_offset(index),
                };
                out.push((location, R::decode(slot)));
            }
            ControlFlow::<()>::Continue(())
        })?;
        Ok(out)
    }

    /// Live-record counts for every table.
    pub fn stats(&self) -> Result<HeapStats> {
        let mut inner = self.inner.lock();
        let mut tables = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let mut live = 0u32;
            inner.scan_slots(kind, |_, slot| {
                if slot_is_live(kind, slot) {
                    live += 1;
                }
                ControlFlow::<()>::Continue(())
            })?;
            tables.push(TableStats {
                kind,
                capacity: inner.header.table(kind).capacity,
                live,
            });
        }
        let file_size = inner.file.metadata()?.len();
        Ok(HeapStats { tables, file_size })
    }

    // ========================================================================
    // Filtered queries
    // ========================================================================

    pub fn vehicles_by_owner(&self, owner_id: u64) -> Result<Vec<VehicleInfo>> {
        self.scan_where(|v: &VehicleInfo| v.owner_driver_id == owner_id)
    }

    /// Up to `limit` trips of one driver, in slot order.
    pub fn trips_by_driver(&self, driver_id: u64, limit: usize) -> Result<Vec<TripRecord>> {
        self.first_where(limit, |t: &TripRecord| t.driver_id == driver_id)
    }

    pub fn maintenance_by_vehicle(&self, vehicle_id: u64) -> Result<Vec<MaintenanceRecord>> {
        self.scan_where(|m: &MaintenanceRecord| m.vehicle_id == vehicle_id)
    }

    /// Up to `limit` expenses of one driver, in slot order.
    pub fn expenses_by_driver(&self, driver_id: u64, limit: usize) -> Result<Vec<ExpenseRecord>> {
        self.first_where(limit, |e: &ExpenseRecord| e.driver_id == driver_id)
    }

    pub fn expenses_by_category(
        &self,
        driver_id: u64,
        category: ExpenseCategory,
    ) -> Result<Vec<ExpenseRecord>> {
        self.scan_where(|e: &ExpenseRecord| e.driver_id == driver_id && e.category == category)
    }

    fn first_where<R: Record>(
        &self,
        limit: usize,
        mut pred: impl FnMut(&R) -> bool,
    ) -> Result<Vec<R>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        self.inner.lock().scan_slots(R::KIND, |_, slot| {
            if R::slot_is_live(slot) {
                let record = R::decode(slot);
                if pred(&record) {
                    out.push(record);
                    if out.len() == limit {
                        return ControlFlow::Break(());
                    }
                }
            }
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Slot array of `kind` as recorded in the header.
    pub fn table_info(&self, kind: EntityKind) -> TableInfo {
        *self.inner.lock().header.table(kind)
    }

    /// Creation time of the file, unix seconds.
    pub fn created_time(&self) -> u64 {
        self.inner.lock().header.created_time
    }

    /// Time of the last write, unix seconds.
    pub fn last_modified(&self) -> u64 {
        self.inner.lock().header.last_modified
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HeapStore {
    fn drop(&mut self) {
        if let Err(e) = self.inner.get_mut().file.sync_all() {
            warn!(path = %self.path.display(), error = %e, "failed to sync heap store on close");
        }
    }
}

impl HeapFile {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Write zeroes over every table region, past the header page.
    fn zero_fill(&mut self) -> Result<()> {
        let zeroes = vec![0u8; ZERO_FILL_CHUNK];
        let end = self.header.total_size;
        self.file.seek(SeekFrom::Start(PAGE_SIZE as u64))?;
        let mut pos = PAGE_SIZE as u64;
        while pos < end {
            let len = (end - pos).min(ZERO_FILL_CHUNK as u64) as usize;
            self.file.write_all(&zeroes[..len])?;
            pos += len as u64;
        }
        Ok(())
    }

    /// Stamp `last_modified` and rewrite the header page.
    fn write_header(&mut self) -> Result<()> {
        self.header.touch();
        let mut page = Page::new();
        self.header.encode(&mut page);
        self.write_all_at(0, page.as_slice())
    }

    fn location(&self, kind: EntityKind, index: u32) -> SlotLocation {
        SlotLocation {
            kind,
            index,
            offset: self.header.table(kind).slot_offset(index),
        }
    }

    fn write_record<R: Record>(&mut self, index: u32, record: &R) -> Result<SlotLocation> {
        let location = self.location(R::KIND, index);
        let mut slot = vec![0u8; R::SIZE];
        record.encode(&mut slot);
        self.write_all_at(location.offset, &slot)?;
        Ok(location)
    }

    fn find_live<R: Record>(&mut self, id: u64) -> Result<Option<(u32, R)>> {
        if id == 0 {
            return Ok(None);
        }
        self.scan_slots(R::KIND, |index, slot| {
            if R::slot_is_live(slot) && slot_id(slot) == id {
                ControlFlow::Break((index, R::decode(slot)))
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Feed every slot of `kind`'s table to `visit` until it breaks.
    fn scan_slots<T>(
        &mut self,
        kind: EntityKind,
        mut visit: impl FnMut(u32, &[u8]) -> ControlFlow<T>,
    ) -> Result<Option<T>> {
        let table = *self.header.table(kind);
        let size = table.record_size as usize;
        let mut buf = vec![0u8; SCAN_CHUNK_SLOTS as usize * size];

        let mut start = 0u32;
        while start < table.capacity {
            let count = (table.capacity - start).min(SCAN_CHUNK_SLOTS);
            let chunk = &mut buf[..count as usize * size];
            self.read_exact_at(table.slot_offset(start), chunk)?;
            for (i, slot) in chunk.chunks_exact(size).enumerate() {
                if let ControlFlow::Break(found) = visit(start + i as u32, slot) {
                    return Ok(Some(found));
                }
            }
            start += count;
        }
        Ok(None)
    }
}

/// Liveness of a raw slot when the record type is only known at runtime.
fn slot_is_live(kind: EntityKind, slot: &[u8]) -> bool {
    use super::records::*;
    match kind {
        EntityKind::Profile => DriverProfile::slot_is_live(slot),
        EntityKind::Vehicle => VehicleInfo::slot_is_live(slot),
        EntityKind::Trip => TripRecord::slot_is_live(slot),
        EntityKind::Maintenance => MaintenanceRecord::slot_is_live(slot),
        EntityKind::Expense => ExpenseRecord::slot_is_live(slot),
        EntityKind::Document => DocumentMetadata::slot_is_live(slot),
        EntityKind::Incident => IncidentReport::slot_is_live(slot),
    }
}
