//! Record kind discriminator.

use std::fmt;

/// The seven record kinds stored by the heap store.
///
/// The discriminant is the entity tag written into composite index keys and
/// secondary index values, so it must stay stable on disk.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Profile = 1,
    Vehicle = 2,
    Trip = 3,
    Maintenance = 4,
    Expense = 5,
    Document = 6,
    Incident = 7,
}

impl EntityKind {
    /// All kinds, in heap table order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Profile,
        EntityKind::Vehicle,
        EntityKind::Trip,
        EntityKind::Maintenance,
        EntityKind::Expense,
        EntityKind::Document,
        EntityKind::Incident,
    ];

    /// Convert from the on-disk tag.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EntityKind::Profile),
            2 => Some(EntityKind::Vehicle),
            3 => Some(EntityKind::Trip),
            4 => Some(EntityKind::Maintenance),
            5 => Some(EntityKind::Expense),
            6 => Some(EntityKind::Document),
            7 => Some(EntityKind::Incident),
            _ => None,
        }
    }

    /// Position of this kind's table in the heap store header.
    #[inline]
    pub fn table_index(self) -> usize {
        self as usize - 1
    }

    /// Bytes per heap slot for this kind.
    pub fn slot_size(self) -> u32 {
        match self {
            EntityKind::Incident => 2048,
            _ => 1024,
        }
    }

    /// Short lowercase name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Profile => "profile",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Trip => "trip",
            EntityKind::Maintenance => "maintenance",
            EntityKind::Expense => "expense",
            EntityKind::Document => "document",
            EntityKind::Incident => "incident",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(EntityKind::from_u8(0), None);
        assert_eq!(EntityKind::from_u8(8), None);
    }

    #[test]
    fn test_table_index_is_dense() {
        let indexes: Vec<usize> = EntityKind::ALL.iter().map(|k| k.table_index()).collect();
        assert_eq!(indexes, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_trip_tag() {
        assert_eq!(EntityKind::Trip as u8, 3);
        assert_eq!(format!("{}", EntityKind::Trip), "trip");
    }
}
