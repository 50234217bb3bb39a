//! Record trait and slot addressing.

use std::fmt;

use crate::common::EntityKind;

/// A fixed-size record stored in one heap table.
///
/// Each kind decides what a free slot looks like: profiles and vehicles
/// carry an explicit active flag, every other kind treats id 0 as free.
/// A zeroed slot is free for every kind.
pub trait Record: Sized + Clone + fmt::Debug {
    const KIND: EntityKind;
    /// Slot size in bytes.
    const SIZE: usize;

    fn id(&self) -> u64;

    /// Timestamp used as the third field of the record's primary key.
    fn timestamp(&self) -> u64;

    fn is_live(&self) -> bool;

    /// Flip the liveness sentinel. Other fields are left untouched.
    fn mark_deleted(&mut self);

    /// Write the record into a `SIZE`-byte slot.
    fn encode(&self, slot: &mut [u8]);

    /// Read a record from a `SIZE`-byte slot.
    ///
    /// Unknown enum tags read as that enum's default variant.
    fn decode(slot: &[u8]) -> Self;

    /// Liveness read straight from slot bytes.
    fn slot_is_live(slot: &[u8]) -> bool;
}

/// Id stored in the first eight bytes of every slot.
#[inline]
pub(crate) fn slot_id(slot: &[u8]) -> u64 {
    let mut id = [0u8; 8];
    id.copy_from_slice(&slot[..8]);
    u64::from_le_bytes(id)
}

/// Where a record lives in the heap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotLocation {
    pub kind: EntityKind,
    /// Slot number within the table.
    pub index: u32,
    /// Absolute byte offset of the slot.
    pub offset: u64,
}

impl fmt::Display for SlotLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.kind, self.index, self.offset)
    }
}
