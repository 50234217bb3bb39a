//! Configuration for FleetDB.
//!
//! Compile-time layout constants live at the top of this module; the
//! runtime [`StoreConfig`] (paths, table capacities, cache sizes) is loaded
//! from a TOML file or built from defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::{EntityKind, Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every tree node, every tree metadata page and the heap store header
/// occupy exactly one page.
pub const PAGE_SIZE: usize = 4096;

/// Maximum keys per composite B-Tree node (order 5).
pub const BTREE_MAX_KEYS: usize = 9;

/// Maximum keys per string B+-Tree node (order 10).
pub const BPLUS_MAX_KEYS: usize = 19;

/// Fixed width of a string index key, including the NUL terminator.
pub const STRING_KEY_LEN: usize = 128;

/// Default number of cached pages for the primary B-Tree.
pub const DEFAULT_PRIMARY_CACHE_PAGES: usize = 256;

/// Default number of cached pages for each secondary B+-Tree.
pub const DEFAULT_SECONDARY_CACHE_PAGES: usize = 64;

/// Number of slots reserved for each record kind in the heap store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableCapacities {
    pub profiles: u32,
    pub vehicles: u32,
    pub trips: u32,
    pub maintenance: u32,
    pub expenses: u32,
    pub documents: u32,
    pub incidents: u32,
}

impl TableCapacities {
    /// The same capacity for every table. Handy for tests.
    pub fn uniform(capacity: u32) -> Self {
        Self {
            profiles: capacity,
            vehicles: capacity,
            trips: capacity,
            maintenance: capacity,
            expenses: capacity,
            documents: capacity,
            incidents: capacity,
        }
    }

    /// Capacity of the table holding `kind`.
    pub fn get(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Profile => self.profiles,
            EntityKind::Vehicle => self.vehicles,
            EntityKind::Trip => self.trips,
            EntityKind::Maintenance => self.maintenance,
            EntityKind::Expense => self.expenses,
            EntityKind::Document => self.documents,
            EntityKind::Incident => self.incidents,
        }
    }

    /// Set the capacity of the table holding `kind`.
    pub fn set(&mut self, kind: EntityKind, capacity: u32) {
        let slot = match kind {
            EntityKind::Profile => &mut self.profiles,
            EntityKind::Vehicle => &mut self.vehicles,
            EntityKind::Trip => &mut self.trips,
            EntityKind::Maintenance => &mut self.maintenance,
            EntityKind::Expense => &mut self.expenses,
            EntityKind::Document => &mut self.documents,
            EntityKind::Incident => &mut self.incidents,
        };
        *slot = capacity;
    }
}

impl Default for TableCapacities {
    fn default() -> Self {
        Self {
            profiles: 10_000,
            vehicles: 50_000,
            trips: 10_000_000,
            maintenance: 100_000,
            expenses: 500_000,
            documents: 100_000,
            incidents: 50_000,
        }
    }
}

/// Runtime configuration of a [`StorageEngine`](crate::StorageEngine).
///
/// # File format
/// ```toml
/// database_path = "data/fleet.db"
/// index_dir = "data/indexes"
/// primary_cache_pages = 256
///
/// [capacities]
/// profiles = 1000
/// trips = 200000
/// ```
/// Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Heap store file.
    pub database_path: PathBuf,
    /// Directory holding the four index files.
    pub index_dir: PathBuf,
    /// Page cache size of the primary B-Tree.
    pub primary_cache_pages: usize,
    /// Page cache size of each secondary B+-Tree.
    pub secondary_cache_pages: usize,
    /// Slots preallocated per table when the heap store is created.
    pub capacities: TableCapacities,
}

impl StoreConfig {
    /// Configuration rooted in `dir`: `dir/fleet.db` and `dir/indexes/`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            database_path: dir.join("fleet.db"),
            index_dir: dir.join("indexes"),
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `Error::Config` if the file cannot be read or parsed, or if a
    /// cache size is zero.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.primary_cache_pages == 0 || self.secondary_cache_pages == 0 {
            return Err(Error::Config("cache page counts must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("compiled/SDM.db"),
            index_dir: PathBuf::from("compiled/indexes"),
            primary_cache_pages: DEFAULT_PRIMARY_CACHE_PAGES,
            secondary_cache_pages: DEFAULT_SECONDARY_CACHE_PAGES,
            capacities: TableCapacities::default(),
        }
    }
}
