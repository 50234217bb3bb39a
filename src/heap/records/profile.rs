//! Driver profiles.

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::Record;

/// Access level of a profile.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserRole {
    #[default]
    Driver = 0,
    Admin = 1,
    FleetManager = 2,
}

impl UserRole {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => UserRole::Admin,
            2 => UserRole::FleetManager,
            _ => UserRole::Driver,
        }
    }
}

/// A driver or staff account.
///
/// Live while `active` is set; deleting clears the flag and keeps the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverProfile {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub license_expiry: u64,
    pub total_trips: u64,
    pub total_distance: f64,
    pub total_fuel_consumed: f64,
    pub safety_score: u32,
    pub harsh_events_count: u32,
    pub created_time: u64,
    pub last_login: u64,
    pub active: bool,
    pub trip_history_head: u64,
    pub trip_history_tail: u64,
}

impl DriverProfile {
    const ACTIVE_OFFSET: usize = 514;
    const USED: usize = 531;

    /// A new active profile with a perfect safety score.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            safety_score: 1000,
            active: true,
            ..Self::default()
        }
    }
}

impl Record for DriverProfile {
    const KIND: EntityKind = EntityKind::Profile;
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
        w.put_str(&self.username, 64);
        w.put_str(&self.password_hash, 65);
        w.put_u8(self.role as u8);
        w.put_str(&self.full_name, 128);
        w.put_str(&self.email, 128);
        w.put_str(&self.phone, 32);
        w.put_str(&self.license_number, 32);
        w.put_u64(self.license_expiry);
        w.put_u64(self.total_trips);
        w.put_f64(self.total_distance);
        w.put_f64(self.total_fuel_consumed);
        w.put_u32(self.safety_score);
        w.put_u32(self.harsh_events_count);
        w.put_u64(self.created_time);
        w.put_u64(self.last_login);
        debug_assert_eq!(w.position(), Self::ACTIVE_OFFSET);
        w.put_bool(self.active);
        w.put_u64(self.trip_history_head);
        w.put_u64(self.trip_history_tail);
        debug_assert_eq!(w.position(), Self::USED);
        w.pad(Self::SIZE - Self::USED);
    }

    fn decode(slot: &[u8]) -> Self {
        let mut r = FieldReader::new(slot);
        Self {
            id: r.u64(),
            username: r.str(64),
            password_hash: r.str(65),
            role: UserRole::from_u8(r.u8()),
            full_name: r.str(128),
            email: r.str(128),
            phone: r.str(32),
            license_number: r.str(32),
            license_expiry: r.u64(),
            total_trips: r.u64(),
            total_distance: r.f64(),
            total_fuel_consumed: r.f64(),
            safety_score: r.u32(),
            harsh_events_count: r.u32(),
            created_time: r.u64(),
            last_login: r.u64(),
            active: r.bool(),
            trip_history_head: r.u64(),
            trip_history_tail: r.u64(),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot[Self::ACTIVE_OFFSET] != 0
    }
}
