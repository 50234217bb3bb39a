//! Trips.

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::{slot_id, Record};

/// One recorded trip. Live while `id != 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripRecord {
    pub id: u64,
    pub driver_id: u64,
    pub vehicle_id: u64,
    pub start_time: u64,
    pub end_time: u64,
    /// Seconds.
    pub duration: u32,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
    pub start_address: String,
    pub end_address: String,
    pub distance: f64,
    pub avg_speed: f64,
    pub max_speed: f64,
    pub fuel_consumed: f64,
    pub fuel_efficiency: f64,
    pub harsh_braking_count: u16,
    pub rapid_acceleration_count: u16,
    pub speeding_count: u16,
    pub sharp_turn_count: u16,
    pub gps_data_offset: u64,
    pub gps_data_count: u32,
    pub notes: String,
}

impl TripRecord {
    const USED: usize = 648;

    pub fn new(id: u64, driver_id: u64, vehicle_id: u64, start_time: u64) -> Self {
        Self {
            id,
            driver_id,
            vehicle_id,
            start_time,
            ..Self::default()
        }
    }
}

impl Record for TripRecord {
    const KIND: EntityKind = EntityKind::Trip;
    const SIZE: usize = 1024;

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> u64 {
        self.start_time
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
        w.put_u64(self.driver_id);
        w.put_u64(self.vehicle_id);
        w.put_u64(self.start_time);
        w.put_u64(self.end_time);
        w.put_u32(self.duration);
        w.put_f64(self.start_latitude);
        w.put_f64(self.start_longitude);
        w.put_f64(self.end_latitude);
        w.put_f64(self.end_longitude);
        w.put_str(&self.start_address, 128);
        w.put_str(&self.end_address, 128);
        w.put_f64(self.distance);
        w.put_f64(self.avg_speed);
        w.put_f64(self.max_speed);
        w.put_f64(self.fuel_consumed);
        w.put_f64(self.fuel_efficiency);
        w.put_u16(self.harsh_braking_count);
        w.put_u16(self.rapid_acceleration_count);
        w.put_u16(self.speeding_count);
        w.put_u16(self.sharp_turn_count);
        w.put_u64(self.gps_data_offset);
        w.put_u32(self.gps_data_count);
        w.put_str(&self.notes, 256);
        debug_assert_eq!(w.position(), Self::USED);
        w.pad(Self::SIZE - Self::USED);
    }

    fn decode(slot: &[u8]) -> Self {
        let mut r = FieldReader::new(slot);
        Self {
            id: r.u64(),
            driver_id: r.u64(),
            vehicle_id: r.u64(),
            start_time: r.u64(),
            end_time: r.u64(),
            duration: r.u32(),
            start_latitude: r.f64(),
            start_longitude: r.f64(),
            end_latitude: r.f64(),
            end_longitude: r.f64(),
            start_address: r.str(128),
            end_address: r.str(128),
            distance: r.f64(),
            avg_speed: r.f64(),
            max_speed: r.f64(),
            fuel_consumed: r.f64(),
            fuel_efficiency: r.f64(),
            harsh_braking_count: r.u16(),
            rapid_acceleration_count: r.u16(),
            speeding_count: r.u16(),
            sharp_turn_count: r.u16(),
            gps_data_offset: r.u64(),
            gps_data_count: r.u32(),
            notes: r.str(256),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot_id(slot) != 0
    }
}
