use crate::common::bytes::{FieldReader, FieldWriter};
use crate::common::EntityKind;
use crate::heap::record::{slot_id, Record};

/// Metadata of an uploaded document. The file body is not stored here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub id: u64,
    pub owner_id: u64,
    pub owner_type: u8,
    pub filename: String,
    pub mime_type: String,
    pub file_size: u64,
    pub upload_date: u64,
    pub expiry_date: u64,
    pub data_offset: u64,
    pub data_blocks: u32,
    pub description: String,
    pub tags: String,
}

impl DocumentMetadata {
    const USED: usize = 757;

    pub fn new(id: u64, owner_id: u64, filename: &str, upload_date: u64) -> Self {
        Self {
            id,
            owner_id,
            filename: filename.to_string(),
            upload_date,
            ..Self::default()
        }
    }
}

impl Record for DocumentMetadata {
    const KIND: EntityKind = EntityKind::Document;
    const SIZE: usize = 1024;

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> u64 {
        self.upload_date
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
        w.put_u64(self.owner_id);
        w.put_u8(self.owner_type);
        w.put_str(&self.filename, 256);
        w.put_str(&self.mime_type, 64);
        w.put_u64(self.file_size);
        w.put_u64(self.upload_date);
        w.put_u64(self.expiry_date);
        w.put_u64(self.data_offset);
        w.put_u32(self.data_blocks);
        w.put_str(&self.description, 256);
        w.put_str(&self.tags, 128);
        debug_assert_eq!(w.position(), Self::USED);
        w.pad(Self::SIZE - Self::USED);
    }

    fn decode(slot: &[u8]) -> Self {
        let mut r = FieldReader::new(slot);
        Self {
            id: r.u64(),
            owner_id: r.u64(),
            owner_type: r.u8(),
            filename: r.str(256),
            mime_type: r.str(64),
            file_size: r.u64(),
            upload_date: r.u64(),
            expiry_date: r.u64(),
            data_offset: r.u64(),
            data_blocks: r.u32(),
            description: r.str(256),
            tags: r.str(128),
        }
    }

    fn slot_is_live(slot: &[u8]) -> bool {
        slot_id(slot) != 0
    }
}
