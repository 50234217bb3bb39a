//! StorageEngine - the heap store and its indexes kept in step.
//!
//! Every stored record gets a primary index entry
//! `(kind, id, timestamp, 0) -> heap offset`, and profiles and vehicles also
//! get secondary entries for their email, username and plate. Reads by id
//! descend the primary B-Tree and then read a single heap slot; the heap's
//! linear scans are only used by filtered queries and rebuilds.
//!
//! Index entries are never removed. A lookup that lands on a deleted or
//! changed record re-checks the heap and skips it.

use std::collections::HashSet;
use std::fs;

use tracing::{debug, info};

use crate::common::config::StoreConfig;
use crate::common::{EntityKind, Error, Result};
use crate::heap::{
    DocumentMetadata, DriverProfile, ExpenseRecord, HeapStats, HeapStore, IncidentReport,
    MaintenanceRecord, Record, SlotLocation, TripRecord, VehicleInfo,
};
use crate::index::{IndexManager, SecondaryIndex, TreeShape};

/// A record kind the engine can store and index.
pub trait Indexed: Record {
    /// Secondary index entries for this record. Empty strings are skipped.
    fn secondary_keys(&self) -> Vec<(SecondaryIndex, &str)> {
        Vec::new()
    }
}

impl Indexed for DriverProfile {
    fn secondary_keys(&self) -> Vec<(SecondaryIndex, &str)> {
        vec![
            (SecondaryIndex::DriverEmail, self.email.as_str()),
            (SecondaryIndex::DriverUsername, self.username.as_str()),
        ]
    }
}

impl Indexed for VehicleInfo {
    fn secondary_keys(&self) -> Vec<(SecondaryIndex, &str)> {
        vec![(SecondaryIndex::VehiclePlate, self.license_plate.as_str())]
    }
}

impl Indexed for TripRecord {}
impl Indexed for MaintenanceRecord {}
impl Indexed for ExpenseRecord {}
impl Indexed for DocumentMetadata {}
impl Indexed for IncidentReport {}

/// Heap store plus index manager, opened together from one [`StoreConfig`].
///
/// All operations take `&self`; share an engine between threads with `Arc`.
/// A write touches the heap first and the indexes second, with no
/// atomicity across the two.
pub struct StorageEngine {
    heap: HeapStore,
    indexes: IndexManager,
}

impl StorageEngine {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the store described by `config`, creating whatever is missing.
    ///
    /// A new heap file gets fresh indexes. An existing heap whose index
    /// directory is empty has its indexes rebuilt from a heap scan.
    ///
    /// # Errors
    /// Fails if either structure cannot be created or opened, including an
    /// index directory holding only some of the index files.
    pub fn open_or_create(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let (heap, heap_created) =
            HeapStore::open_or_create(&config.database_path, &config.capacities)?;
        let engine = Self {
            heap,
            indexes: IndexManager::from_config(config),
        };

        if heap_created {
            engine.indexes.create_indexes()?;
        } else if engine.indexes.open_or_create_indexes()? {
            engine.rebuild_indexes()?;
        }

        info!(
            heap = %config.database_path.display(),
            indexes = %config.index_dir.display(),
            "storage engine ready"
        );
        Ok(engine)
    }

    /// Sync the heap file and every index file.
    pub fn flush(&self) -> Result<()> {
        self.heap.flush()?;
        self.indexes.flush()
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Next unused id for `kind`, persisted in the heap header.
    pub fn allocate_id(&self, kind: EntityKind) -> Result<u64> {
        self.heap.allocate_id(kind)
    }

    /// Store `record` and index it.
    ///
    /// # Errors
    /// See [`HeapStore::insert`]; index failures surface as
    /// `Error::IndexFailure` after the heap write has happened.
    pub fn insert<R: Indexed>(&self, record: &R) -> Result<SlotLocation> {
        let location = self.heap.insert(record)?;
        self.index_record(record, location)?;
        Ok(location)
    }

    /// The live record with `id`, found through the primary index.
    pub fn get<R: Indexed>(&self, id: u64) -> Result<Option<R>> {
        Ok(self.resolve::<R>(id)?.map(|(_, record)| record))
    }

    /// Overwrite the live record with `record.id()`.
    ///
    /// New timestamps and secondary keys are indexed; old entries stay and
    /// are filtered out on lookup.
    ///
    /// # Errors
    /// `Error::RecordNotFound` if no live record has that id.
    pub fn update<R: Indexed>(&self, record: &R) -> Result<SlotLocation> {
        let location = self
            .heap
            .update(record)?
            .ok_or(Error::RecordNotFound {
                kind: R::KIND,
                id: record.id(),
            })?;
        self.index_record(record, location)?;
        Ok(location)
    }

    /// Mark the record with `id` deleted.
    ///
    /// # Errors
    /// `Error::RecordNotFound` if no live record has that id.
    pub fn delete<R: Indexed>(&self, id: u64) -> Result<SlotLocation> {
        let location = self
            .heap
            .delete::<R>(id)?
            .ok_or(Error::RecordNotFound { kind: R::KIND, id })?;
        debug!(%location, id, "record deleted");
        Ok(location)
    }

    // ========================================================================
    // Secondary lookups
    // ========================================================================

    pub fn find_profile_by_email(&self, email: &str) -> Result<Option<DriverProfile>> {
        self.find(SecondaryIndex::DriverEmail, email, |p: &DriverProfile| {
            p.email == email
        })
    }

    pub fn find_profile_by_username(&self, username: &str) -> Result<Option<DriverProfile>> {
        self.find(SecondaryIndex::DriverUsername, username, |p: &DriverProfile| {
            p.username == username
        })
    }

    pub fn find_vehicle_by_plate(&self, plate: &str) -> Result<Option<VehicleInfo>> {
        self.find(SecondaryIndex::VehiclePlate, plate, |v: &VehicleInfo| {
            v.license_plate == plate
        })
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Re-add every live profile and vehicle to the secondary indexes.
    ///
    /// Not idempotent: entries already present are added a second time.
    pub fn rebuild_secondary_indexes(&self) -> Result<()> {
        self.indexes
            .rebuild_profile_indexes(&self.heap.scan::<DriverProfile>()?)?;
        self.indexes
            .rebuild_vehicle_indexes(&self.heap.scan::<VehicleInfo>()?)
    }

    /// Live-record counts of the heap.
    pub fn stats(&self) -> Result<HeapStats> {
        self.heap.stats()
    }

    /// Structural check of all four indexes.
    pub fn verify_indexes(&self) -> Result<Vec<(&'static str, TreeShape)>> {
        self.indexes.verify()
    }

    pub fn heap(&self) -> &HeapStore {
        &self.heap
    }

    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Add the primary entry and any secondary entries `record` lacks.
    fn index_record<R: Indexed>(&self, record: &R, location: SlotLocation) -> Result<()> {
        let id = record.id();
        let timestamp = record.timestamp();
        if self.indexes.search_primary(R::KIND, id, timestamp)? != Some(location.offset) {
            self.indexes
                .insert_primary(R::KIND, id, timestamp, location.offset)?;
        }
        for (index, key) in record.secondary_keys() {
            if key.is_empty() || self.indexes.search_all(index, key)?.contains(&id) {
                continue;
            }
            self.indexes.insert_secondary(index, key, id)?;
        }
        Ok(())
    }

    /// Walk the primary entries of `(R::KIND, id)` newest first and return
    /// the first one still pointing at a live record with that id.
    fn resolve<R: Indexed>(&self, id: u64) -> Result<Option<(u64, R)>> {
        let entries = self.indexes.primary_range_for_entity(R::KIND, id)?;
        let mut seen = HashSet::new();
        for (_, value) in entries.into_iter().rev() {
            if !seen.insert(value.offset) {
                continue;
            }
            if let Some(record) = self.heap.read_at::<R>(value.offset)? {
                if record.id() == id {
                    return Ok(Some((value.offset, record)));
                }
            }
        }
        Ok(None)
    }

    fn find<R: Indexed>(
        &self,
        index: SecondaryIndex,
        key: &str,
        matches: impl Fn(&R) -> bool,
    ) -> Result<Option<R>> {
        if key.is_empty() {
            return Ok(None);
        }
        for id in self.indexes.search_all(index, key)?.into_iter().rev() {
            if let Some(record) = self.get::<R>(id)? {
                if matches(&record) {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// Index every live record of every kind. Used when the index files were
    /// missing on open.
    fn rebuild_indexes(&self) -> Result<()> {
        let mut total = 0;
        total += self.index_kind::<DriverProfile>()?;
        total += self.index_kind::<VehicleInfo>()?;
        total += self.index_kind::<TripRecord>()?;
        total += self.index_kind::<MaintenanceRecord>()?;
        total += self.index_kind::<ExpenseRecord>()?;
        total += self.index_kind::<DocumentMetadata>()?;
        total += self.index_kind::<IncidentReport>()?;
        info!(records = total, "rebuilt indexes from heap");
        Ok(())
    }

    fn index_kind<R: Indexed>(&self) -> Result<usize> {
        let records = self.heap.scan_located::<R>()?;
        for (location, record) in &records {
            self.index_record(record, *location)?;
        }
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::TableCapacities;
    use crate::heap::ExpenseCategory;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> StoreConfig {
        let mut config = StoreConfig::in_dir(dir);
        config.capacities = TableCapacities::uniform(16);
        config.primary_cache_pages = 16;
        config.secondary_cache_pages = 8;
        config
    }

    fn driver(engine: &StorageEngine, name: &str) -> DriverProfile {
        let mut p = DriverProfile::new(engine.allocate_id(EntityKind::Profile).unwrap());
        p.username = name.into();
        p.email = format!("{name}@fleet.io");
        p.created_time = 1_700_000_000 + p.id;
        p
    }

    #[test]
    fn test_insert_and_get() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open_or_create(&config(dir.path())).unwrap();

        let ana = driver(&engine, "ana");
        engine.insert(&ana).unwrap();

        assert_eq!(engine.get::<DriverProfile>(ana.id).unwrap(), Some(ana.clone()));
        assert_eq!(engine.get::<DriverProfile>(ana.id + 1).unwrap(), None);
        assert_eq!(engine.find_profile_by_email("ana@fleet.io").unwrap(), Some(ana.clone()));
        assert_eq!(engine.find_profile_by_username("ana").unwrap(), Some(ana));
        assert_eq!(engine.find_profile_by_email("").unwrap(), None);
    }

    #[test]
    fn test_update_reindexes() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open_or_create(&config(dir.path())).unwrap();

        let mut v = VehicleInfo::new(engine.allocate_id(EntityKind::Vehicle).unwrap(), 1);
        v.license_plate = "OLD-1".into();
        engine.insert(&v).unwrap();

        v.license_plate = "NEW-1".into();
        v.created_time = 99;
        engine.update(&v).unwrap();

        assert_eq!(engine.find_vehicle_by_plate("OLD-1").unwrap(), None);
        assert_eq!(engine.find_vehicle_by_plate("NEW-1").unwrap(), Some(v.clone()));
        assert_eq!(engine.get::<VehicleInfo>(v.id).unwrap(), Some(v));
    }

    #[test]
    fn test_update_and_delete_missing() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open_or_create(&config(dir.path())).unwrap();

        assert!(matches!(
            engine.update(&TripRecord::new(5, 1, 1, 1)),
            Err(Error::RecordNotFound { kind: EntityKind::Trip, id: 5 })
        ));
        assert!(matches!(
            engine.delete::<TripRecord>(5),
            Err(Error::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_hides_record() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open_or_create(&config(dir.path())).unwrap();

        let ana = driver(&engine, "ana");
        engine.insert(&ana).unwrap();
        engine.delete::<DriverProfile>(ana.id).unwrap();

        assert_eq!(engine.get::<DriverProfile>(ana.id).unwrap(), None);
        assert_eq!(engine.find_profile_by_email("ana@fleet.io").unwrap(), None);

        // a new driver may take over the email
        let other = driver(&engine, "ana");
        engine.insert(&other).unwrap();
        assert_eq!(
            engine.find_profile_by_email("ana@fleet.io").unwrap().map(|p| p.id),
            Some(other.id)
        );
    }

    #[test]
    fn test_reused_slot_does_not_resolve_old_id() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open_or_create(&config(dir.path())).unwrap();

        let first = ExpenseRecord::new(1, 3, ExpenseCategory::Toll, 10);
        let loc = engine.insert(&first).unwrap();
        engine.delete::<ExpenseRecord>(1).unwrap();
        let second = ExpenseRecord::new(2, 3, ExpenseCategory::Fuel, 20);
        assert_eq!(engine.insert(&second).unwrap().offset, loc.offset);

        assert_eq!(engine.get::<ExpenseRecord>(1).unwrap(), None);
        assert_eq!(engine.get::<ExpenseRecord>(2).unwrap(), Some(second));
    }

    #[test]
    fn test_missing_indexes_rebuilt_on_open() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let trip = TripRecord::new(7, 1, 2, 5000);
        {
            let engine = StorageEngine::open_or_create(&config).unwrap();
            let ana = driver(&engine, "ana");
            engine.insert(&ana).unwrap();
            engine.insert(&trip).unwrap();
        }
        fs::remove_dir_all(&config.index_dir).unwrap();

        let engine = StorageEngine::open_or_create(&config).unwrap();
        assert_eq!(engine.get::<TripRecord>(7).unwrap(), Some(trip));
        assert!(engine.find_profile_by_username("ana").unwrap().is_some());
        assert_eq!(engine.indexes().primary_count().unwrap(), 2);
    }

    #[test]
    fn test_rebuild_secondary_adds_duplicates() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open_or_create(&config(dir.path())).unwrap();
        let ana = driver(&engine, "ana");
        engine.insert(&ana).unwrap();

        engine.rebuild_secondary_indexes().unwrap();
        assert_eq!(engine.indexes().email_count().unwrap(), 2);
        // lookups still return the one record
        assert_eq!(engine.find_profile_by_email("ana@fleet.io").unwrap(), Some(ana));
    }
}
