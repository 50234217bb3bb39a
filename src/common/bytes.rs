//! Little-endian field codec for fixed-layout pages and records.
//!
//! Every on-disk structure is written field by field through a
//! [`FieldWriter`] and read back with a [`FieldReader`], so the binary
//! format never depends on in-memory struct layout.
//!
//! Both cursors panic if a field runs past the end of the buffer; layouts
//! are fixed and checked by each structure's size assertions.

/// Sequential little-endian writer over a byte slice.
pub struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    /// Start writing at offset 0 of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start writing at `pos`.
    pub fn at(buf: &'a mut [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    pub fn put_u8(&mut self, v: u8) {
        self.put_bytes(&[v]);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.put_u8(u8::from(v));
    }

    pub fn put_u16(&mut self, v: u16) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_f64(&mut self, v: f64) {
        self.put_bytes(&v.to_le_bytes());
    }

    /// Write `s` into a fixed `width`-byte field, NUL padded.
    ///
    /// At most `width - 1` bytes are kept so the field is always terminated;
    /// truncation backs off to a UTF-8 character boundary.
    pub fn put_str(&mut self, s: &str, width: usize) {
        let field = &mut self.buf[self.pos..self.pos + width];
        field.fill(0);
        let len = truncated_len(s, width.saturating_sub(1));
        field[..len].copy_from_slice(&s.as_bytes()[..len]);
        self.pos += width;
    }

    /// Skip `n` bytes, zeroing them.
    pub fn pad(&mut self, n: usize) {
        self.buf[self.pos..self.pos + n].fill(0);
        self.pos += n;
    }
}

/// Sequential little-endian reader over a byte slice.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Start reading at offset 0 of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    pub fn u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    pub fn bool(&mut self) -> bool {
        self.u8() != 0
    }

    pub fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.bytes())
    }

    pub fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.bytes())
    }

    pub fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.bytes())
    }

    pub fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.bytes())
    }

    /// Read a fixed `width`-byte NUL-padded string field.
    pub fn str(&mut self, width: usize) -> String {
        let field = &self.buf[self.pos..self.pos + width];
        self.pos += width;
        let end = field.iter().position(|&b| b == 0).unwrap_or(width);
        String::from_utf8_lossy(&field[..end]).into_owned()
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
pub(crate) fn truncated_len(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut len = max;
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    len
}
