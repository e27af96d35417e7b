//! Byte buffer holding fixed-width primitive values in little-endian layout,
//! 8-byte aligned at the start of its allocation (spec §4.1).

use byteorder::{ByteOrder, LittleEndian};

/// Rounds `len` up to the next multiple of 8.
pub fn align8(len: usize) -> usize {
    (len + 7) & !7
}

/// A little-endian-encoded, 8-byte-aligned byte buffer. On little-endian
/// hosts, typed views into the buffer are zero-copy; on big-endian hosts
/// callers must decode element-wise (see [`Buffer::get_le_u32`] and friends).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    // `Vec<u8>`'s allocator-provided alignment is at least that of `u64` for
    // any non-trivial capacity on every target we support, so padding the
    // logical length to a multiple of 8 is sufficient to guarantee 8-byte
    // aligned page starts when buffers are laid out back-to-back by the
    // file writer (see `crate::file::writer`).
    bytes: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends raw bytes verbatim, for callers that already hold a
    /// byte-cast view of their values (e.g. `bytemuck::cast_slice`).
    pub fn extend_from_slice(&mut self, raw: &[u8]) {
        self.bytes.extend_from_slice(raw);
    }

    pub fn push_i32_le(&mut self, v: i32) {
        let mut raw = [0u8; 4];
        LittleEndian::write_i32(&mut raw, v);
        self.bytes.extend_from_slice(&raw);
    }

    pub fn push_i64_le(&mut self, v: i64) {
        let mut raw = [0u8; 8];
        LittleEndian::write_i64(&mut raw, v);
        self.bytes.extend_from_slice(&raw);
    }

    pub fn push_f32_le(&mut self, v: f32) {
        let mut raw = [0u8; 4];
        LittleEndian::write_f32(&mut raw, v);
        self.bytes.extend_from_slice(&raw);
    }

    pub fn push_f64_le(&mut self, v: f64) {
        let mut raw = [0u8; 8];
        LittleEndian::write_f64(&mut raw, v);
        self.bytes.extend_from_slice(&raw);
    }

    pub fn get_i32_le(&self, idx: usize) -> i32 {
        let off = idx * 4;
        LittleEndian::read_i32(&self.bytes[off..off + 4])
    }

    pub fn get_i64_le(&self, idx: usize) -> i64 {
        let off = idx * 8;
        LittleEndian::read_i64(&self.bytes[off..off + 8])
    }

    pub fn get_f32_le(&self, idx: usize) -> f32 {
        let off = idx * 4;
        LittleEndian::read_f32(&self.bytes[off..off + 4])
    }

    pub fn get_f64_le(&self, idx: usize) -> f64 {
        let off = idx * 8;
        LittleEndian::read_f64(&self.bytes[off..off + 8])
    }

    /// Pads the buffer with zero bytes up to the next 8-byte boundary.
    /// Used by the file writer before starting the next page.
    pub fn pad_to_align8(&mut self) {
        let target = align8(self.bytes.len());
        self.bytes.resize(target, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_primitives() {
        let mut ints = Buffer::new();
        ints.push_i32_le(-7);
        ints.push_i32_le(42);
        assert_eq!(ints.get_i32_le(0), -7);
        assert_eq!(ints.get_i32_le(1), 42);

        let mut floats = Buffer::new();
        floats.push_f64_le(3.5);
        assert_eq!(floats.get_f64_le(0), 3.5);
    }

    #[test]
    fn pad_to_align8() {
        let mut buf = Buffer::new();
        buf.push_i32_le(1);
        buf.pad_to_align8();
        assert_eq!(buf.len() % 8, 0);
    }
}
