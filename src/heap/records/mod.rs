//! The seven fixed-layout record kinds.
//!
//! Every record is encoded field by field, little-endian, with strings in
//! NUL-padded fixed-width fields, and padded with zeros to its slot size.

mod document;
mod expense;
mod incident;
mod maintenance;
mod profile;
mod trip;
mod vehicle;

pub use document::DocumentMetadata;
pub use expense::{ExpenseCategory, ExpenseRecord};
pub use incident::{IncidentReport, IncidentType, INCIDENT_PHOTOS};
pub use maintenance::{MaintenanceRecord, MaintenanceType};
pub use profile::{DriverProfile, UserRole};
pub use trip::TripRecord;
pub use vehicle::{VehicleInfo, VehicleType};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EntityKind;
    use crate::heap::record::{slot_id, Record};

    fn encode<R: Record>(record: &R) -> Vec<u8> {
        let mut slot = vec![0xAAu8; R::SIZE];
        record.encode(&mut slot);
        slot
    }

    fn check_slot_size<R: Record>() {
        assert_eq!(R::SIZE, R::KIND.slot_size() as usize, "{}", R::KIND);
    }

    #[test]
    fn test_slot_sizes_match_kinds() {
        check_slot_size::<DriverProfile>();
        check_slot_size::<VehicleInfo>();
        check_slot_size::<TripRecord>();
        check_slot_size::<MaintenanceRecord>();
        check_slot_size::<ExpenseRecord>();
        check_slot_size::<DocumentMetadata>();
        check_slot_size::<IncidentReport>();
        assert_eq!(IncidentReport::KIND, EntityKind::Incident);
    }

    #[test]
    fn test_profile_layout() {
        let mut p = DriverProfile::new(42);
        p.username = "jdoe".into();
        p.email = "jdoe@fleet.example".into();
        p.role = UserRole::FleetManager;
        p.created_time = 1_700_000_000;
        p.total_distance = 1234.5;

        let slot = encode(&p);
        assert_eq!(slot_id(&slot), 42);
        assert_eq!(&slot[8..12], b"jdoe");
        assert_eq!(slot[8 + 64 + 65], UserRole::FleetManager as u8);
        assert_eq!(slot[514], 1);
        // padding is zeroed even over a dirty buffer
        assert!(slot[531..].iter().all(|&b| b == 0));

        let back = DriverProfile::decode(&slot);
        assert_eq!(back, p);
        assert_eq!(back.safety_score, 1000);
        assert!(DriverProfile::slot_is_live(&slot));
    }

    #[test]
    fn test_profile_delete_keeps_fields() {
        let mut p = DriverProfile::new(7);
        p.username = "kept".into();
        p.mark_deleted();
        assert!(!p.is_live());

        let slot = encode(&p);
        assert!(!DriverProfile::slot_is_live(&slot));
        assert_eq!(DriverProfile::decode(&slot).username, "kept");
        assert_eq!(slot_id(&slot), 7);
    }

    #[test]
    fn test_vehicle_active_flag_offset() {
        let mut v = VehicleInfo::new(3, 1);
        v.license_plate = "ABC-123".into();
        v.vehicle_type = VehicleType::Truck;

        let slot = encode(&v);
        assert_eq!(slot[457], 1);
        assert_eq!(&slot[16..23], b"ABC-123");
        assert_eq!(VehicleInfo::decode(&slot), v);

        v.mark_deleted();
        assert_eq!(encode(&v)[457], 0);
    }

    #[test]
    fn test_id_sentinel_kinds() {
        let mut trip = TripRecord::new(5, 1, 2, 100);
        assert!(trip.is_live());
        trip.mark_deleted();
        assert_eq!(trip.id, 0);
        assert!(!TripRecord::slot_is_live(&encode(&trip)));

        let zero = vec![0u8; 2048];
        assert!(!IncidentReport::slot_is_live(&zero));
        assert!(!MaintenanceRecord::slot_is_live(&zero[..1024]));
        assert!(!DriverProfile::slot_is_live(&zero[..1024]));
    }

    #[test]
    fn test_trip_roundtrip() {
        let mut t = TripRecord::new(9, 1, 2, 1000);
        t.end_time = 1600;
        t.duration = 600;
        t.start_address = "Depot".into();
        t.notes = "n".repeat(300);
        t.harsh_braking_count = 3;

        let back = TripRecord::decode(&encode(&t));
        assert_eq!(back.notes.len(), 255);
        assert_eq!(back.harsh_braking_count, 3);
        assert_eq!(back.start_address, "Depot");
        assert_eq!(back.timestamp(), 1000);
    }

    #[test]
    fn test_maintenance_and_expense_roundtrip() {
        let mut m = MaintenanceRecord::new(1, 2, 3);
        m.maintenance_type = MaintenanceType::BrakeService;
        m.currency = "EUR".into();
        m.total_cost = 99.5;
        assert_eq!(MaintenanceRecord::decode(&encode(&m)), m);

        let mut e = ExpenseRecord::new(4, 5, ExpenseCategory::Fuel, 6);
        e.fuel_quantity = 40.0;
        e.tax_deductible = true;
        e.fuel_station = "Shell".into();
        assert_eq!(ExpenseRecord::decode(&encode(&e)), e);
    }

    #[test]
    fn test_document_and_incident_roundtrip() {
        let mut d = DocumentMetadata::new(8, 1, "license.pdf", 77);
        d.mime_type = "application/pdf".into();
        assert_eq!(DocumentMetadata::decode(&encode(&d)), d);

        let mut i = IncidentReport::new(11, 1, IncidentType::Theft, 500);
        i.photo_doc_ids = [1, 2, 3, 4, 5];
        i.resolved = true;
        i.description = "window broken".into();
        let slot = encode(&i);
        assert_eq!(slot.len(), 2048);
        assert!(slot[1802..].iter().all(|&b| b == 0));
        assert_eq!(IncidentReport::decode(&slot), i);
    }

    #[test]
    fn test_unknown_enum_tags_fall_back() {
        assert_eq!(UserRole::from_u8(200), UserRole::Driver);
        assert_eq!(VehicleType::from_u8(9), VehicleType::Sedan);
        assert_eq!(MaintenanceType::from_u8(9), MaintenanceType::GeneralService);
        assert_eq!(ExpenseCategory::from_u8(9), ExpenseCategory::Other);
        assert_eq!(IncidentType::from_u8(9), IncidentType::Accident);
    }
}
