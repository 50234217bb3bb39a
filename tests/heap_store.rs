//! Integration tests for the record heap.

use fleetdb::heap::{
    DriverProfile, IncidentReport, IncidentType, MaintenanceRecord, TripRecord, VehicleInfo,
};
use fleetdb::{EntityKind, Error, HeapStore, TableCapacities};
use tempfile::tempdir;

#[test]
fn test_full_table_leaves_state_unchanged() {
    let dir = tempdir().unwrap();
    let mut caps = TableCapacities::uniform(10);
    caps.set(EntityKind::Maintenance, 5);
    let heap = HeapStore::create(dir.path().join("fleet.db"), &caps).unwrap();

    for id in 1..=5 {
        heap.insert(&MaintenanceRecord::new(id, 1, id * 100)).unwrap();
    }
    let before = heap.stats().unwrap();

    match heap.insert(&MaintenanceRecord::new(6, 1, 600)) {
        Err(Error::SlotExhausted { kind, capacity }) => {
            assert_eq!(kind, EntityKind::Maintenance);
            assert_eq!(capacity, 5);
        }
        other => panic!("expected a full table, got {other:?}"),
    }

    assert_eq!(heap.stats().unwrap(), before);
    assert_eq!(heap.read::<MaintenanceRecord>(6).unwrap(), None);
    // other tables are unaffected
    heap.insert(&TripRecord::new(1, 1, 1, 1)).unwrap();
}

#[test]
fn test_create_then_open_exposes_same_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fleet.db");
    let caps = TableCapacities {
        profiles: 3,
        vehicles: 4,
        trips: 50,
        maintenance: 6,
        expenses: 7,
        documents: 8,
        incidents: 9,
    };

    let created: Vec<_> = {
        let heap = HeapStore::create(&path, &caps).unwrap();
        EntityKind::ALL.iter().map(|&k| heap.table_info(k)).collect()
    };
    let heap = HeapStore::open(&path).unwrap();
    let opened: Vec<_> = EntityKind::ALL.iter().map(|&k| heap.table_info(k)).collect();

    assert_eq!(created, opened);
    for (kind, info) in EntityKind::ALL.iter().zip(&opened) {
        assert_eq!(info.capacity, caps.get(*kind));
        assert_eq!(info.record_size, kind.slot_size());
    }
}

#[test]
fn test_insert_read_delete_cycle() {
    let dir = tempdir().unwrap();
    let heap = HeapStore::create(dir.path().join("fleet.db"), &TableCapacities::uniform(4)).unwrap();

    let mut profile = DriverProfile::new(1);
    profile.full_name = "Ana Ruiz".into();
    profile.email = "ana@fleet.io".into();
    heap.insert(&profile).unwrap();

    let mut incident = IncidentReport::new(1, 1, IncidentType::Accident, 1_700_000_000);
    incident.description = "rear bumper".into();
    heap.insert(&incident).unwrap();

    assert_eq!(heap.read::<DriverProfile>(1).unwrap(), Some(profile));
    assert_eq!(heap.read::<IncidentReport>(1).unwrap(), Some(incident));

    heap.delete::<DriverProfile>(1).unwrap();
    heap.delete::<IncidentReport>(1).unwrap();
    assert_eq!(heap.read::<DriverProfile>(1).unwrap(), None);
    assert_eq!(heap.read::<IncidentReport>(1).unwrap(), None);
    assert!(heap.scan::<DriverProfile>().unwrap().is_empty());
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fleet.db");
    {
        let heap = HeapStore::create(&path, &TableCapacities::uniform(8)).unwrap();
        for id in 1..=3 {
            let mut v = VehicleInfo::new(id, 42);
            v.license_plate = format!("KX-{id}");
            heap.insert(&v).unwrap();
        }
        heap.delete::<VehicleInfo>(2).unwrap();
    }

    let heap = HeapStore::open(&path).unwrap();
    let plates: Vec<String> = heap
        .vehicles_by_owner(42)
        .unwrap()
        .into_iter()
        .map(|v| v.license_plate)
        .collect();
    assert_eq!(plates, vec!["KX-1", "KX-3"]);
    assert_eq!(heap.stats().unwrap().live(EntityKind::Vehicle), 2);
    assert_eq!(heap.allocate_id(EntityKind::Vehicle).unwrap(), 4);
}
