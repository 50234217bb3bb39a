//! Incident reports. The only record kind with a 2048-byte slot.

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::{slot_id, Record};

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncidentType {
    #[default]
    Accident = 0,
    Breakdown = 1,
    Theft = 2,
    Vandalism = 3,
    TrafficViolation = 4,
}

impl IncidentType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IncidentType::Breakdown,
            2 => IncidentType::Theft,
            3 => IncidentType::Vandalism,
            4 => IncidentType::TrafficViolation,
            _ => IncidentType::Accident,
        }
    }
}

/// Number of photo document references an incident carries.
pub const INCIDENT_PHOTOS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentReport {
    pub id: u64,
    pub driver_id: u64,
    pub vehicle_id: u64,
    pub trip_id: u64,
    pub incident_type: IncidentType,
    pub incident_time: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub location_address: String,
    pub description: String,
    pub police_report_number: String,
    pub insurance_claim_number: String,
    pub other_party_info: String,
    pub witness_info: String,
    pub estimated_damage: f64,
    pub insurance_payout: f64,
    pub currency: String,
    pub photo_doc_ids: [u64; INCIDENT_PHOTOS],
    pub report_doc_id: u64,
    pub resolved: bool,
    pub resolved_date: u64,
    pub notes: String,
}

impl IncidentReport {
    const USED: usize = 1802;

    pub fn new(id: u64, driver_id: u64, incident_type: IncidentType, incident_time: u64) -> Self {
        Self {
            id,
            driver_id,
            incident_type,
            incident_time,
            ..Self::default()
        }
    }
}

impl Record for IncidentReport {
    const KIND: EntityKind = EntityKind::Incident;
    const SIZE: usize = 2048;

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> u64 {
        self.incident_time
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
        w.put_u64(self.trip_id);
        w.put_u8(self.incident_type as u8);
        w.put_u64(self.incident_time);
        w.put_f64(self.latitude);
        w.put_f64(self.longitude);
        w.put_str(&self.location_address, 256);
        w.put_str(&self.description, 512);
        w.put_str(&self.police_report_number, 64);
        w.put_str(&self.insurance_claim_number, 64);
        w.put_str(&self.other_party_info, 256);
        w.put_str(&self.witness_info, 256);
        w.put_f64(self.estimated_damage);
        w.put_f64(self.insurance_payout);
        w.put_str(&self.currency, 8);
        for doc in self.photo_doc_ids {
            w.put_u64(doc);
        }
        w.put_u64(self.report_doc_id);
        w.put_bool(self.resolved);
        w.put_u64(self.resolved_date);
        w.put_str(&self.notes, 256);
        debug_assert_eq!(w.position(), Self::USED);
        w.pad(Self::SIZE - Self::USED);
    }

    fn decode(slot: &[u8]) -> Self {
        let mut r = FieldReader::new(slot);
        let id = r.u64();
        let driver_id = r.u64();
        let vehicle_id = r.u64();
        let trip_id = r.u64();
        let incident_type = IncidentType::from_u8(r.u8());
        let incident_time = r.u64();
        let latitude = r.f64();
        let longitude = r.f64();
        let location_address = r.str(256);
        let description = r.str(512);
        let police_report_number = r.str(64);
        let insurance_claim_number = r.str(64);
        let other_party_info = r.str(256);
        let witness_info = r.str(256);
        let estimated_damage = r.f64();
        let insurance_payout = r.f64();
        let currency = r.str(8);
        let mut photo_doc_ids = [0u64; INCIDENT_PHOTOS];
        for doc in photo_doc_ids.iter_mut() {
            *doc = r.u64();
        }
        Self {
            id,
            driver_id,
            vehicle_id,
            trip_id,
            incident_type,
            incident_time,
            latitude,
            longitude,
            location_address,
            description,
            police_report_number,
            insurance_claim_number,
            other_party_info,
            witness_info,
            estimated_damage,
            insurance_payout,
            currency,
            photo_doc_ids,
            report_doc_id: r.u64(),
            resolved: r.bool(),
            resolved_date: r.u64(),
            notes: r.str(256),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot_id(slot) != 0
    }
}
