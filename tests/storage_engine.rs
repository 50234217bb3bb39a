//! End-to-end tests of the storage engine.

use std::sync::Arc;
use std::thread;

use fleetdb::heap::{DriverProfile, ExpenseCategory, ExpenseRecord, TripRecord, VehicleInfo};
use fleetdb::{EntityKind, Error, StorageEngine, StoreConfig, TableCapacities};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn small_config(dir: &std::path::Path) -> StoreConfig {
    let mut config = StoreConfig::in_dir(dir.join("data"));
    config.capacities = TableCapacities::uniform(64);
    config.primary_cache_pages = 32;
    config.secondary_cache_pages = 8;
    config
}

fn new_driver(engine: &StorageEngine, username: &str) -> DriverProfile {
    let mut p = DriverProfile::new(engine.allocate_id(EntityKind::Profile).unwrap());
    p.username = username.into();
    p.email = format!("{username}@fleet.io");
    p.full_name = username.to_uppercase();
    p
}

#[test]
fn test_driver_vehicle_trip_flow() {
    init_tracing();
    let dir = tempdir().unwrap();
    let engine = StorageEngine::open_or_create(&small_config(dir.path())).unwrap();

    let driver = new_driver(&engine, "maria");
    engine.insert(&driver).unwrap();

    let mut car = VehicleInfo::new(engine.allocate_id(EntityKind::Vehicle).unwrap(), driver.id);
    car.license_plate = "FLT-001".into();
    car.make = "Toyota".into();
    engine.insert(&car).unwrap();

    for start in [1_000u64, 2_000, 3_000] {
        let mut trip = TripRecord::new(
            engine.allocate_id(EntityKind::Trip).unwrap(),
            driver.id,
            car.id,
            start,
        );
        trip.distance = start as f64 / 100.0;
        engine.insert(&trip).unwrap();
    }

    let found = engine.find_vehicle_by_plate("FLT-001").unwrap().unwrap();
    assert_eq!(found.owner_driver_id, driver.id);
    assert_eq!(
        engine.find_profile_by_username("maria").unwrap().map(|p| p.id),
        Some(driver.id)
    );

    let trips = engine.heap().trips_by_driver(driver.id, 10).unwrap();
    assert_eq!(trips.len(), 3);
    let second = engine.get::<TripRecord>(trips[1].id).unwrap().unwrap();
    assert_eq!(second.start_time, 2_000);

    // trips are indexed by (kind, id, start time)
    let offsets = engine
        .indexes()
        .range_query_primary(EntityKind::Trip, second.id, 0, u64::MAX)
        .unwrap();
    assert_eq!(offsets.len(), 1);

    let stats = engine.stats().unwrap();
    assert_eq!(stats.live(EntityKind::Trip), 3);
    assert_eq!(stats.live(EntityKind::Profile), 1);

    for (name, shape) in engine.verify_indexes().unwrap() {
        assert_eq!(shape.leaf_depth, shape.height, "{name}");
    }
}

#[test]
fn test_reopen_keeps_records_indexes_and_ids() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let driver_id = {
        let engine = StorageEngine::open_or_create(&config).unwrap();
        let driver = new_driver(&engine, "li");
        engine.insert(&driver).unwrap();
        engine
            .insert(&ExpenseRecord::new(1, driver.id, ExpenseCategory::Parking, 77))
            .unwrap();
        engine.flush().unwrap();
        driver.id
    };

    let engine = StorageEngine::open_or_create(&config).unwrap();
    assert_eq!(engine.indexes().primary_count().unwrap(), 2);
    assert_eq!(
        engine.find_profile_by_email("li@fleet.io").unwrap().map(|p| p.id),
        Some(driver_id)
    );
    assert!(engine.get::<ExpenseRecord>(1).unwrap().is_some());
    // ids are not reused across restarts
    assert!(engine.allocate_id(EntityKind::Profile).unwrap() > driver_id);
    assert!(engine.allocate_id(EntityKind::Expense).unwrap() > 1);
}

#[test]
fn test_concurrent_inserts_through_arc() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(StorageEngine::open_or_create(&small_config(dir.path())).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..10u64 {
                    let id = engine.allocate_id(EntityKind::Trip).unwrap();
                    engine
                        .insert(&TripRecord::new(id, t, 1, t * 1000 + i))
                        .unwrap();
                    ids.push(id);
                }
                ids
            })
        })
        .collect();

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 40);

    for id in &all {
        assert!(engine.get::<TripRecord>(*id).unwrap().is_some(), "trip {id}");
    }
    assert_eq!(engine.indexes().primary_count().unwrap(), 40);
    assert_eq!(engine.heap().scan::<TripRecord>().unwrap().len(), 40);
}

#[test]
fn test_corrupt_heap_header_is_reported() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    drop(StorageEngine::open_or_create(&config).unwrap());

    let mut bytes = std::fs::read(&config.database_path).unwrap();
    bytes[30] ^= 0x5A;
    std::fs::write(&config.database_path, bytes).unwrap();

    assert!(matches!(
        StorageEngine::open_or_create(&config),
        Err(Error::CorruptFile(_))
    ));
}

#[test]
fn test_partial_index_directory_fails_open() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    drop(StorageEngine::open_or_create(&config).unwrap());

    std::fs::remove_file(config.index_dir.join("vehicle_plate.idx")).unwrap();

    match StorageEngine::open_or_create(&config) {
        Err(Error::IndexFailure { index, .. }) => assert_eq!(index, "vehicle_plate"),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("open should fail"),
    }
}

#[test]
fn test_config_file_drives_layout() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("store");
    let config_path = dir.path().join("fleetdb.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
            database_path = "{db}"
            index_dir = "{idx}"
            secondary_cache_pages = 4

            [capacities]
            profiles = 2
            "#,
            db = data.join("fleet.db").display(),
            idx = data.join("idx").display(),
        ),
    )
    .unwrap();

    let mut config = StoreConfig::load(&config_path).unwrap();
    config.capacities.trips = 8;
    config.capacities.vehicles = 8;
    config.capacities.maintenance = 8;
    config.capacities.expenses = 8;
    config.capacities.documents = 8;
    config.capacities.incidents = 8;
    let engine = StorageEngine::open_or_create(&config).unwrap();

    assert_eq!(engine.heap().table_info(EntityKind::Profile).capacity, 2);
    engine.insert(&new_driver(&engine, "a")).unwrap();
    engine.insert(&new_driver(&engine, "b")).unwrap();
    assert!(matches!(
        engine.insert(&new_driver(&engine, "c")),
        Err(Error::SlotExhausted { kind: EntityKind::Profile, .. })
    ));
    assert!(engine.indexes().dir().ends_with("idx"));
}
