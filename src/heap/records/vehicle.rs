//! Vehicles.

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::Record;

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VehicleType {
    #[default]
    Sedan = 0,
    Suv = 1,
    Truck = 2,
    Van = 3,
    Motorcycle = 4,
}

impl VehicleType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => VehicleType::Suv,
            2 => VehicleType::Truck,
            3 => VehicleType::Van,
            4 => VehicleType::Motorcycle,
            _ => VehicleType::Sedan,
        }
    }
}

/// A vehicle registered to a driver. Live while `active` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleInfo {
    pub id: u64,
    pub owner_driver_id: u64,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub year: u32,
    pub vehicle_type: VehicleType,
    pub color: String,
    pub vin: String,
    pub engine_capacity: u32,
    pub fuel_tank_capacity: f64,
    pub fuel_type: String,
    pub current_odometer: f64,
    pub last_service_odometer: f64,
    pub insurance_provider: String,
    pub insurance_policy: String,
    pub insurance_expiry: u64,
    pub registration_expiry: u64,
    pub last_maintenance_date: u64,
    pub next_maintenance_due: u64,
    pub created_time: u64,
    pub active: bool,
}

impl VehicleInfo {
    const ACTIVE_OFFSET: usize = 457;
    const USED: usize = 458;

    pub fn new(id: u64, owner_driver_id: u64) -> Self {
        Self {
            id,
            owner_driver_id,
            active: true,
            ..Self::default()
        }
    }
}

impl Record for VehicleInfo {
    const KIND: EntityKind = EntityKind::Vehicle;
    const SIZE: usize = 1024;

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> u64 {
        self.created_time
    }

    fn is_live(&self) -> bool {
        self.active
    }

    fn mark_deleted(&mut self) {
        self.active = false;
    }

    fn encode(&self, slot: &mut [u8]) {
        let mut w = FieldWriter::new(slot);
        w.put_u64(self.id);
        w.put_u64(self.owner_driver_id);
        w.put_str(&self.license_plate, 32);
        w.put_str(&self.make, 64);
        w.put_str(&self.model, 64);
        w.put_u32(self.year);
        w.put_u8(self.vehicle_type as u8);
        w.put_str(&self.color, 32);
        w.put_str(&self.vin, 32);
        w.put_u32(self.engine_capacity);
        w.put_f64(self.fuel_tank_capacity);
        w.put_str(&self.fuel_type, 16);
        w.put_f64(self.current_odometer);
        w.put_f64(self.last_service_odometer);
        w.put_str(&self.insurance_provider, 64);
        w.put_str(&self.insurance_policy, 64);
        w.put_u64(self.insurance_expiry);
        w.put_u64(self.registration_expiry);
        w.put_u64(self.last_maintenance_date);
        w.put_u64(self.next_maintenance_due);
        w.put_u64(self.created_time);
        debug_assert_eq!(w.position(), Self::ACTIVE_OFFSET);
        w.put_bool(self.active);
        debug_assert_eq!(w.position(), Self::USED);
        w.pad(Self::SIZE - Self::USED);
    }

    fn decode(slot: &[u8]) -> Self {
        let mut r = FieldReader::new(slot);
        Self {
            id: r.u64(),
            owner_driver_id: r.u64(),
            license_plate: r.str(32),
            make: r.str(64),
            model: r.str(64),
            year: r.u32(),
            vehicle_type: VehicleType::from_u8(r.u8()),
            color: r.str(32),
            vin: r.str(32),
            engine_capacity: r.u32(),
            fuel_tank_capacity: r.f64(),
            fuel_type: r.str(16),
            current_odometer: r.f64(),
            last_service_odometer: r.f64(),
            insurance_provider: r.str(64),
            insurance_policy: r.str(64),
            insurance_expiry: r.u64(),
            registration_expiry: r.u64(),
            last_maintenance_date: r.u64(),
            next_maintenance_due: r.u64(),
            created_time: r.u64(),
            active: r.bool(),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot[Self::ACTIVE_OFFSET] != 0
    }
}
