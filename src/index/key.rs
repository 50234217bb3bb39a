//! Keys and values stored in the index trees.
//!
//! All four types have a fixed encoded width so a node's key and value
//! arrays sit at fixed offsets inside its page.

use std::cmp::Ordering;
use std::fmt;

use crate::common::bytes::{truncated_len, FieldReader, FieldWriter};
use crate::common::config::STRING_KEY_LEN;
use crate::common::{EntityKind, Error, Result};

/// Fixed-width little-endian encoding of a key or value.
pub trait FixedCodec: Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    fn encode(&self, w: &mut FieldWriter<'_>);

    /// # Errors
    /// Returns `Error::CorruptFile` if the bytes are not a valid value.
    fn decode(r: &mut FieldReader<'_>) -> Result<Self>;
}

// ============================================================================
// CompositeKey
// ============================================================================

/// Primary index key: (entity kind, id, timestamp, sequence).
///
/// Ordered lexicographically in field order, which the derived `Ord` gives
/// because the fields are declared in that order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    pub kind: u8,
    pub id: u64,
    pub timestamp: u64,
    pub sequence: u32,
}

impl CompositeKey {
    pub fn new(kind: EntityKind, id: u64, timestamp: u64, sequence: u32) -> Self {
        Self {
            kind: kind as u8,
            id,
            timestamp,
            sequence,
        }
    }

    /// Smallest key of entity `(kind, id)`.
    pub fn entity_start(kind: EntityKind, id: u64) -> Self {
        Self::new(kind, id, 0, 0)
    }

    /// Largest key of entity `(kind, id)`.
    pub fn entity_end(kind: EntityKind, id: u64) -> Self {
        Self::new(kind, id, u64::MAX, u32::MAX)
    }
}

impl FixedCodec for CompositeKey {
    const SIZE: usize = 1 + 8 + 8 + 4;

    fn encode(&self, w: &mut FieldWriter<'_>) {
        w.put_u8(self.kind);
        w.put_u64(self.id);
        w.put_u64(self.timestamp);
        w.put_u32(self.sequence);
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            kind: r.u8(),
            id: r.u64(),
            timestamp: r.u64(),
            sequence: r.u32(),
        })
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.kind, self.id, self.timestamp, self.sequence
        )
    }
}

// ============================================================================
// BTreeValue
// ============================================================================

/// Primary index value: where a record lives in the heap file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BTreeValue {
    /// Byte offset of the record's slot.
    pub offset: u64,
    pub file_id: u8,
    /// Slot size in bytes.
    pub size: u16,
}

impl BTreeValue {
    /// File id of the heap store.
    pub const HEAP_FILE: u8 = 1;

    pub fn new(offset: u64, size: u16) -> Self {
        Self {
            offset,
            file_id: Self::HEAP_FILE,
            size,
        }
    }
}

impl FixedCodec for BTreeValue {
    const SIZE: usize = 8 + 1 + 2;

    fn encode(&self, w: &mut FieldWriter<'_>) {
        w.put_u64(self.offset);
        w.put_u8(self.file_id);
        w.put_u16(self.size);
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            offset: r.u64(),
            file_id: r.u8(),
            size: r.u16(),
        })
    }
}

// ============================================================================
// StringKey
// ============================================================================

/// Secondary index key: a NUL-terminated string in a fixed 128-byte buffer.
///
/// Strings longer than 127 bytes are truncated at a character boundary.
/// Comparison is byte-wise up to the terminator, so it is case sensitive.
#[derive(Clone, Copy)]
pub struct StringKey([u8; STRING_KEY_LEN]);

impl StringKey {
    pub fn new(s: &str) -> Self {
        let mut buf = [0u8; STRING_KEY_LEN];
        let len = truncated_len(s, STRING_KEY_LEN - 1);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self(buf)
    }

    /// Key bytes before the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(STRING_KEY_LEN);
        &self.0[..end]
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl From<&str> for StringKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq for StringKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for StringKey {}

impl PartialOrd for StringKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StringKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Debug for StringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringKey({:?})", self.to_string_lossy())
    }
}

impl FixedCodec for StringKey {
    const SIZE: usize = STRING_KEY_LEN;

    fn encode(&self, w: &mut FieldWriter<'_>) {
        w.put_bytes(&self.0);
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let mut buf: [u8; STRING_KEY_LEN] = r.bytes();
        // normalize anything after the terminator
        if let Some(end) = buf.iter().position(|&b| b == 0) {
            buf[end..].fill(0);
        }
        Ok(Self(buf))
    }
}

// ============================================================================
// BPlusValue
// ============================================================================

/// Secondary index value: the id and kind of the referenced record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BPlusValue {
    pub id: u64,
    pub kind: EntityKind,
}

impl BPlusValue {
    pub fn new(id: u64, kind: EntityKind) -> Self {
        Self { id, kind }
    }
}

impl FixedCodec for BPlusValue {
    const SIZE: usize = 8 + 1;

    fn encode(&self, w: &mut FieldWriter<'_>) {
        w.put_u64(self.id);
        w.put_u8(self.kind as u8);
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let id = r.u64();
        let raw = r.u8();
        let kind = EntityKind::from_u8(raw)
            .ok_or_else(|| Error::corrupt(format!("unknown entity kind {raw} in index value")))?;
        Ok(Self { id, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: FixedCodec>(value: &T) -> T {
        let mut buf = vec![0u8; T::SIZE];
        let mut w = FieldWriter::new(&mut buf);
        value.encode(&mut w);
        assert_eq!(w.position(), T::SIZE);
        T::decode(&mut FieldReader::new(&buf)).unwrap()
    }

    #[test]
    fn test_composite_key_order_is_field_order() {
        let base = CompositeKey::new(EntityKind::Trip, 10, 500, 0);

        assert!(base < CompositeKey::new(EntityKind::Maintenance, 0, 0, 0));
        assert!(base < CompositeKey::new(EntityKind::Trip, 11, 0, 0));
        assert!(base < CompositeKey::new(EntityKind::Trip, 10, 501, 0));
        assert!(base < CompositeKey::new(EntityKind::Trip, 10, 500, 1));
        assert_eq!(base, CompositeKey::new(EntityKind::Trip, 10, 500, 0));
    }

    #[test]
    fn test_entity_bounds_cover_all_timestamps() {
        let start = CompositeKey::entity_start(EntityKind::Vehicle, 7);
        let end = CompositeKey::entity_end(EntityKind::Vehicle, 7);
        let key = CompositeKey::new(EntityKind::Vehicle, 7, 1_700_000_000, 3);

        assert!(start <= key && key <= end);
        assert!(end < CompositeKey::entity_start(EntityKind::Vehicle, 8));
    }

    #[test]
    fn test_fixed_codecs() {
        let key = CompositeKey::new(EntityKind::Expense, u64::MAX, 42, 7);
        assert_eq!(roundtrip(&key), key);

        let value = BTreeValue::new(4096 + 1024 * 3, 1024);
        assert_eq!(roundtrip(&value), value);
        assert_eq!(value.file_id, BTreeValue::HEAP_FILE);

        let value = BPlusValue::new(99, EntityKind::Vehicle);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_bplus_value_rejects_unknown_kind() {
        let mut buf = [0u8; BPlusValue::SIZE];
        buf[8] = 42;
        assert!(matches!(
            BPlusValue::decode(&mut FieldReader::new(&buf)),
            Err(Error::CorruptFile(_))
        ));
    }

    #[test]
    fn test_string_key_compares_bytes() {
        assert!(StringKey::new("alice@example.com") < StringKey::new("bob@example.com"));
        assert!(StringKey::new("ABC") < StringKey::new("abc"));
        assert!(StringKey::new("ab") < StringKey::new("abc"));
        assert_eq!(StringKey::new("x"), StringKey::from("x"));
        assert!(StringKey::new("").is_empty());
    }

    #[test]
    fn test_string_key_truncates_to_127_bytes() {
        let long = "p".repeat(300);
        let key = StringKey::new(&long);
        assert_eq!(key.as_bytes().len(), STRING_KEY_LEN - 1);
        assert_eq!(key, StringKey::new(&long[..127]));

        let decoded = roundtrip(&key);
        assert_eq!(decoded, key);
        assert_eq!(decoded.to_string_lossy(), long[..127]);
    }

    #[test]
    fn test_string_key_ignores_bytes_after_terminator() {
        let mut buf = [0u8; STRING_KEY_LEN];
        buf[..3].copy_from_slice(b"abc");
        buf[10] = b'z';

        let key = StringKey::decode(&mut FieldReader::new(&buf)).unwrap();
        assert_eq!(key, StringKey::new("abc"));
        assert_eq!(format!("{key:?}"), "StringKey(\"abc\")");
    }
}
