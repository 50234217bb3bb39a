//! Expenses.

use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::{slot_id, Record};

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpenseCategory {
    Fuel = 0,
    Maintenance = 1,
    Insurance = 2,
    Toll = 3,
    Parking = 4,
    #[default]
    Other = 5,
}

impl ExpenseCategory {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ExpenseCategory::Fuel,
            1 => ExpenseCategory::Maintenance,
            2 => ExpenseCategory::Insurance,
            3 => ExpenseCategory::Toll,
            4 => ExpenseCategory::Parking,
            _ => ExpenseCategory::Other,
        }
    }
}

/// A cost paid by a driver, optionally tied to a vehicle and a trip.
///
/// The fuel fields are only meaningful for [`ExpenseCategory::Fuel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseRecord {
    pub id: u64,
    pub driver_id: u64,
    pub vehicle_id: u64,
    pub trip_id: u64,
    pub category: ExpenseCategory,
    pub expense_date: u64,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub fuel_quantity: f64,
    pub fuel_price_per_unit: f64,
    pub fuel_station: String,
    pub payment_method: String,
    pub receipt_number: String,
    pub tax_deductible: bool,
    pub tax_amount: f64,
    pub receipt_doc_id: u64,
    pub notes: String,
}

impl ExpenseRecord {
    const USED: usize = 826;

    pub fn new(id: u64, driver_id: u64, category: ExpenseCategory, expense_date: u64) -> Self {
        Self {
            id,
            driver_id,
            category,
            expense_date,
            ..Self::default()
        }
    }
}

impl Record for ExpenseRecord {
    const KIND: EntityKind = EntityKind::Expense;
    const SIZE: usize = 1024;

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> u64 {
        self.expense_date
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
        w.put_u8(self.category as u8);
        w.put_u64(self.expense_date);
        w.put_f64(self.amount);
        w.put_str(&self.currency, 8);
        w.put_str(&self.description, 256);
        w.put_f64(self.fuel_quantity);
        w.put_f64(self.fuel_price_per_unit);
        w.put_str(&self.fuel_station, 128);
        w.put_str(&self.payment_method, 32);
        w.put_str(&self.receipt_number, 64);
        w.put_bool(self.tax_deductible);
        w.put_f64(self.tax_amount);
        w.put_u64(self.receipt_doc_id);
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
            trip_id: r.u64(),
            category: ExpenseCategory::from_u8(r.u8()),
            expense_date: r.u64(),
            amount: r.f64(),
            currency: r.str(8),
            description: r.str(256),
            fuel_quantity: r.f64(),
            fuel_price_per_unit: r.f64(),
            fuel_station: r.str(128),
            payment_method: r.str(32),
            receipt_number: r.str(64),
            tax_deductible: r.bool(),
            tax_amount: r.f64(),
            receipt_doc_id: r.u64(),
            notes: r.str(256),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot_id(slot) != 0
    }
}
