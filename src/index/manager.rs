//! Index facade: the primary B-Tree and three string B+-Trees as one unit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::buffer::CacheStats;
use crate::common::config::StoreConfig;
use crate::common::{EntityKind, Error, Result};
use crate::heap::{DriverProfile, VehicleInfo};

use super::bplus_tree::BPlusTree;
use super::btree::BTree;
use super::key::{BPlusValue, BTreeValue, CompositeKey, StringKey};
use super::tree::TreeShape;

pub const PRIMARY: &str = "primary";
pub const DRIVER_EMAIL: &str = "driver_email";
pub const DRIVER_USERNAME: &str = "driver_username";
pub const VEHICLE_PLATE: &str = "vehicle_plate";

/// One of the three string indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryIndex {
    DriverEmail,
    DriverUsername,
    VehiclePlate,
}

impl SecondaryIndex {
    pub fn name(self) -> &'static str {
        match self {
            SecondaryIndex::DriverEmail => DRIVER_EMAIL,
            SecondaryIndex::DriverUsername => DRIVER_USERNAME,
            SecondaryIndex::VehiclePlate => VEHICLE_PLATE,
        }
    }

    /// Kind of record the index points at.
    pub fn target(self) -> EntityKind {
        match self {
            SecondaryIndex::DriverEmail | SecondaryIndex::DriverUsername => EntityKind::Profile,
            SecondaryIndex::VehiclePlate => EntityKind::Vehicle,
        }
    }
}

const PRIMARY_FILE: &str = "primary.idx";
const EMAIL_FILE: &str = "driver_email.idx";
const USERNAME_FILE: &str = "driver_username.idx";
const PLATE_FILE: &str = "vehicle_plate.idx";
const INDEX_FILES: [&str; 4] = [PRIMARY_FILE, EMAIL_FILE, USERNAME_FILE, PLATE_FILE];

struct Indexes {
    primary: BTree,
    email: BPlusTree,
    username: BPlusTree,
    plate: BPlusTree,
}

/// Owns the four index files of a store directory.
///
/// The indexes are created or opened together: if any one of them fails,
/// none is kept and the error names the failing index
/// ([`Error::IndexFailure`]). Every other operation returns
/// [`Error::NotOpen`] until then.
///
/// Rebuilding is not idempotent. Trees accept duplicate keys, so rebuilding
/// over already-indexed records adds a second entry for each.
pub struct IndexManager {
    dir: PathBuf,
    primary_cache_pages: usize,
    secondary_cache_pages: usize,
    indexes: RwLock<Option<Indexes>>,
}

impl IndexManager {
    pub fn new<P: Into<PathBuf>>(
        dir: P,
        primary_cache_pages: usize,
        secondary_cache_pages: usize,
    ) -> Self {
        Self {
            dir: dir.into(),
            primary_cache_pages,
            secondary_cache_pages,
            indexes: RwLock::new(None),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.index_dir.clone(),
            config.primary_cache_pages,
            config.secondary_cache_pages,
        )
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create all four index files, replacing existing ones.
    pub fn create_indexes(&self) -> Result<()> {
        let mut slot = self.indexes.write();
        // old trees flush on drop and must be gone before files are truncated
        *slot = None;

        fs::create_dir_all(&self.dir)?;
        let indexes = match self.create_all() {
            Ok(indexes) => indexes,
            Err(e) => {
                // trees built so far were dropped on the way out
                self.remove_index_files();
                return Err(e);
            }
        };

        *slot = Some(indexes);
        info!(dir = %self.dir.display(), "created indexes");
        Ok(())
    }

    fn create_all(&self) -> Result<Indexes> {
        let secondary = |file: &str, name: &'static str| {
            BPlusTree::create(self.dir.join(file), name, self.secondary_cache_pages)
                .map_err(|e| e.in_index(name))
        };
        Ok(Indexes {
            primary: BTree::create(self.dir.join(PRIMARY_FILE), self.primary_cache_pages)
                .map_err(|e| e.in_index(PRIMARY))?,
            email: secondary(EMAIL_FILE, DRIVER_EMAIL)?,
            username: secondary(USERNAME_FILE, DRIVER_USERNAME)?,
            plate: secondary(PLATE_FILE, VEHICLE_PLATE)?,
        })
    }

    /// Best-effort removal after a failed create, so the directory reads as
    /// empty to [`IndexManager::open_or_create_indexes`].
    fn remove_index_files(&self) {
        for file in INDEX_FILES {
            let path = self.dir.join(file);
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed partial index file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove index file"),
            }
        }
    }

    /// Open all four index files.
    ///
    /// # Errors
    /// `Error::IndexFailure` naming the first index that is missing or
    /// corrupt; the manager stays closed.
    pub fn open_indexes(&self) -> Result<()> {
        let mut slot = self.indexes.write();
        *slot = None;

        let secondary = |file: &str, name: &'static str| {
            BPlusTree::open(self.dir.join(file), self.secondary_cache_pages)
                .map_err(|e| e.in_index(name))
        };
        let indexes = Indexes {
            primary: BTree::open(self.dir.join(PRIMARY_FILE), self.primary_cache_pages)
                .map_err(|e| e.in_index(PRIMARY))?,
            email: secondary(EMAIL_FILE, DRIVER_EMAIL)?,
            username: secondary(USERNAME_FILE, DRIVER_USERNAME)?,
            plate: secondary(PLATE_FILE, VEHICLE_PLATE)?,
        };

        info!(
            dir = %self.dir.display(),
            primary = indexes.primary.total_records(),
            emails = indexes.email.total_entries(),
            plates = indexes.plate.total_entries(),
            "opened indexes"
        );
        *slot = Some(indexes);
        Ok(())
    }

    /// Open the indexes if any index file exists, otherwise create them.
    ///
    /// Returns `true` if the indexes were newly created. A directory with
    /// only some of the files fails to open rather than being recreated.
    pub fn open_or_create_indexes(&self) -> Result<bool> {
        let any_present = INDEX_FILES
            .iter()
            .any(|file| self.dir.join(file).exists());
        if any_present {
            self.open_indexes()?;
            Ok(false)
        } else {
            self.create_indexes()?;
            Ok(true)
        }
    }

    /// Flush and release all index files. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut slot = self.indexes.write();
        if let Some(indexes) = slot.as_ref() {
            indexes.flush()?;
        }
        *slot = None;
        Ok(())
    }

    /// Sync every index file to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.indexes()?.flush()
    }

    pub fn is_open(&self) -> bool {
        self.indexes.read().is_some()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ========================================================================
    // Primary index
    // ========================================================================

    /// Index the record `(kind, id)` stored at heap byte `offset`.
    pub fn insert_primary(
        &self,
        kind: EntityKind,
        id: u64,
        timestamp: u64,
        offset: u64,
    ) -> Result<()> {
        let key = CompositeKey::new(kind, id, timestamp, 0);
        let value = BTreeValue::new(offset, kind.slot_size() as u16);
        self.indexes()?
            .primary
            .insert(key, value)
            .map_err(|e| e.in_index(PRIMARY))
    }

    /// Heap offset recorded for exactly `(kind, id, timestamp)`.
    pub fn search_primary(&self, kind: EntityKind, id: u64, timestamp: u64) -> Result<Option<u64>> {
        let key = CompositeKey::new(kind, id, timestamp, 0);
        let found = self
            .indexes()?
            .primary
            .search(&key)
            .map_err(|e| e.in_index(PRIMARY))?;
        Ok(found.map(|v| v.offset))
    }

    /// Heap offsets of `(kind, id)` entries with `start <= timestamp <= end`,
    /// in timestamp order.
    pub fn range_query_primary(
        &self,
        kind: EntityKind,
        id: u64,
        start: u64,
        end: u64,
    ) -> Result<Vec<u64>> {
        let low = CompositeKey::new(kind, id, start, 0);
        let high = CompositeKey::new(kind, id, end, u32::MAX);
        let entries = self
            .indexes()?
            .primary
            .range_query(&low, &high)
            .map_err(|e| e.in_index(PRIMARY))?;
        Ok(entries.into_iter().map(|(_, v)| v.offset).collect())
    }

    /// Every primary entry of `(kind, id)`, whatever its timestamp.
    pub fn primary_range_for_entity(
        &self,
        kind: EntityKind,
        id: u64,
    ) -> Result<Vec<(CompositeKey, BTreeValue)>> {
        self.indexes()?
            .primary
            .range_query(
                &CompositeKey::entity_start(kind, id),
                &CompositeKey::entity_end(kind, id),
            )
            .map_err(|e| e.in_index(PRIMARY))
    }

    // ========================================================================
    // Secondary indexes
    // ========================================================================

    pub fn insert_email(&self, email: &str, driver_id: u64) -> Result<()> {
        let indexes = self.indexes()?;
        insert_string(&indexes.email, DRIVER_EMAIL, email, driver_id, EntityKind::Profile)
    }

    pub fn search_by_email(&self, email: &str) -> Result<Option<u64>> {
        search_string(&self.indexes()?.email, DRIVER_EMAIL, email)
    }

    pub fn insert_username(&self, username: &str, driver_id: u64) -> Result<()> {
        let indexes = self.indexes()?;
        insert_string(&indexes.username, DRIVER_USERNAME, username, driver_id, EntityKind::Profile)
    }

    pub fn search_by_username(&self, username: &str) -> Result<Option<u64>> {
        search_string(&self.indexes()?.username, DRIVER_USERNAME, username)
    }

    pub fn insert_plate(&self, plate: &str, vehicle_id: u64) -> Result<()> {
        let indexes = self.indexes()?;
        insert_string(&indexes.plate, VEHICLE_PLATE, plate, vehicle_id, EntityKind::Vehicle)
    }

    pub fn search_by_plate(&self, plate: &str) -> Result<Option<u64>> {
        search_string(&self.indexes()?.plate, VEHICLE_PLATE, plate)
    }

    /// Add `key -> id` to the index `index`.
    pub fn insert_secondary(&self, index: SecondaryIndex, key: &str, id: u64) -> Result<()> {
        let indexes = self.indexes()?;
        insert_string(indexes.secondary(index), index.name(), key, id, index.target())
    }

    /// Every id stored under `key`, in insertion order.
    ///
    /// Keys are never removed, so this includes ids whose record has since
    /// been deleted or changed.
    pub fn search_all(&self, index: SecondaryIndex, key: &str) -> Result<Vec<u64>> {
        let key = StringKey::new(key);
        let indexes = self.indexes()?;
        let entries = indexes
            .secondary(index)
            .range(&key, &key)
            .map_err(|e| e.in_index(index.name()))?;
        Ok(entries.into_iter().map(|(_, v)| v.id).collect())
    }

    /// Index every profile's email and username.
    pub fn rebuild_profile_indexes(&self, profiles: &[DriverProfile]) -> Result<()> {
        for profile in profiles {
            self.insert_email(&profile.email, profile.id)?;
            self.insert_username(&profile.username, profile.id)?;
        }
        info!(count = profiles.len(), "rebuilt profile indexes");
        Ok(())
    }

    /// Index every vehicle's license plate.
    pub fn rebuild_vehicle_indexes(&self, vehicles: &[VehicleInfo]) -> Result<()> {
        for vehicle in vehicles {
            self.insert_plate(&vehicle.license_plate, vehicle.id)?;
        }
        info!(count = vehicles.len(), "rebuilt vehicle indexes");
        Ok(())
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn primary_count(&self) -> Result<u64> {
        Ok(self.indexes()?.primary.total_records())
    }

    pub fn email_count(&self) -> Result<u64> {
        Ok(self.indexes()?.email.total_entries())
    }

    pub fn username_count(&self) -> Result<u64> {
        Ok(self.indexes()?.username.total_entries())
    }

    pub fn plate_count(&self) -> Result<u64> {
        Ok(self.indexes()?.plate.total_entries())
    }

    /// Structural check of all four trees.
    pub fn verify(&self) -> Result<Vec<(&'static str, TreeShape)>> {
        let indexes = self.indexes()?;
        Ok(vec![
            (PRIMARY, indexes.primary.verify().map_err(|e| e.in_index(PRIMARY))?),
            (DRIVER_EMAIL, indexes.email.verify().map_err(|e| e.in_index(DRIVER_EMAIL))?),
            (
                DRIVER_USERNAME,
                indexes.username.verify().map_err(|e| e.in_index(DRIVER_USERNAME))?,
            ),
            (VEHICLE_PLATE, indexes.plate.verify().map_err(|e| e.in_index(VEHICLE_PLATE))?),
        ])
    }

    pub fn cache_stats(&self) -> Result<Vec<(&'static str, CacheStats)>> {
        let indexes = self.indexes()?;
        Ok(vec![
            (PRIMARY, indexes.primary.cache_stats()),
            (DRIVER_EMAIL, indexes.email.cache_stats()),
            (DRIVER_USERNAME, indexes.username.cache_stats()),
            (VEHICLE_PLATE, indexes.plate.cache_stats()),
        ])
    }

    fn indexes(&self) -> Result<MappedRwLockReadGuard<'_, Indexes>> {
        RwLockReadGuard::try_map(self.indexes.read(), Option::as_ref)
            .map_err(|_| Error::NotOpen("index manager"))
    }
}

impl Indexes {
    fn secondary(&self, index: SecondaryIndex) -> &BPlusTree {
        match index {
            SecondaryIndex::DriverEmail => &self.email,
            SecondaryIndex::DriverUsername => &self.username,
            SecondaryIndex::VehiclePlate => &self.plate,
        }
    }

    fn flush(&self) -> Result<()> {
        self.primary.flush().map_err(|e| e.in_index(PRIMARY))?;
        self.email.flush().map_err(|e| e.in_index(DRIVER_EMAIL))?;
        self.username.flush().map_err(|e| e.in_index(DRIVER_USERNAME))?;
        self.plate.flush().map_err(|e| e.in_index(VEHICLE_PLATE))
    }
}

fn insert_string(
    tree: &BPlusTree,
    name: &'static str,
    key: &str,
    id: u64,
    kind: EntityKind,
) -> Result<()> {
    tree.insert(StringKey::new(key), BPlusValue::new(id, kind))
        .map_err(|e| e.in_index(name))
}

fn search_string(tree: &BPlusTree, name: &'static str, key: &str) -> Result<Option<u64>> {
    let found = tree
        .search(&StringKey::new(key))
        .map_err(|e| e.in_index(name))?;
    Ok(found.map(|v| v.id))
}
