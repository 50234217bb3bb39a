use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::{slot_id, Record};

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaintenanceType {
    OilChange = 0,
    TireRotation = 1,
    BrakeService = 2,
    EngineCheck = 3,
    Transmission = 4,
    #[default]
    GeneralService = 5,
}

impl MaintenanceType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MaintenanceType::OilChange,
            1 => MaintenanceType::TireRotation,
            2 => MaintenanceType::BrakeService,
            3 => MaintenanceType::EngineCheck,
            4 => MaintenanceType::Transmission,
            _ => MaintenanceType::GeneralService,
        }
    }
}

/// A service visit for one vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceRecord {
    pub id: u64,
    pub vehicle_id: u64,
    pub driver_id: u64,
    pub maintenance_type: MaintenanceType,
    pub service_date: u64,
    pub odometer_reading: f64,
    pub service_center: String,
    pub technician: String,
    pub description: String,
    pub labor_cost: f64,
    pub parts_cost: f64,
    pub total_cost: f64,
    pub currency: String,
    pub parts_replaced: String,
    pub next_service_date: u64,
    pub next_service_odometer: f64,
    pub receipt_doc_id: u64,
    pub notes: String,
}

impl MaintenanceRecord {
    const USED: usize = 864;

    pub fn new(id: u64, vehicle_id: u64, service_date: u64) -> Self {
        Self {
            id,
            vehicle_id,
            service_date,
            ..Self::default()
        }
    }
}

impl Record for MaintenanceRecord {
    const KIND: EntityKind = EntityKind::Maintenance;
    const SIZE: usize = 1024;

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> u64 {
        self.service_date
    }

    fn is_live(&self) -> bool {
        self.id != 0
    }

    fn mark_deleted(&mut self) {
        self.id = 0;
    }

    fn encode(&self, slot: &mut [u8]) {
        let mut w = FieldWriter::new(slot);
        w.put_u64(self.id);
        w.put_u64(self.vehicle_id);
        w.put_u64(self.driver_id);
        w.put_u8(self.maintenance_type as u8);
        w.put_u64(self.service_date);
        w.put_f64(self.odometer_reading);
        w.put_str(&self.service_center, 128);
        w.put_str(&self.technician, 64);
        w.put_str(&self.description, 192);
        w.put_f64(self.labor_cost);
        w.put_f64(self.parts_cost);
        w.put_f64(self.total_cost);
        w.put_str(&self.currency, 8);
        w.put_str(&self.parts_replaced, 192);
        w.put_u64(self.next_service_date);
        w.put_f64(self.next_service_odometer);
        w.put_u64(self.receipt_doc_id);
        w.put_str(&self.notes, 191);
        debug_assert_eq!(w.position(), Self::USED);
        w.pad(Self::SIZE - Self::USED);
    }

    fn decode(slot: &[u8]) -> Self {
        let mut r = FieldReader::new(slot);
        Self {
            id: r.u64(),
            vehicle_id: r.u64(),
            driver_id: r.u64(),
            maintenance_type: MaintenanceType::from_u8(r.u8()),
            service_date: r.u64(),
            odometer_reading: r.f64(),
            service_center: r.str(128),
            technician: r.str(64),
            description: r.str(192),
            labor_cost: r.f64(),
            parts_cost: r.f64(),
            total_cost: r.f64(),
            currency: r.str(8),
            parts_replaced: r.str(192),
            next_service_date: r.u64(),
            next_service_odometer: r.f64(),
            receipt_doc_id: r.u64(),
            notes: r.str(191),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot_id(slot) != 0
    }
}
