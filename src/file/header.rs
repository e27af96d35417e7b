//! Fixed 8 KiB file header (spec §4.4, §6): schema summary, row count,
//! format version, reserved padding.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, VectorLiteError};
use crate::schema::Schema;

pub const HEADER_SIZE: usize = 8192;
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
pub struct Header {
    pub format_version: u32,
    pub num_rows: u64,
    pub schema: Schema,
}

impl Header {
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut buf = [0u8; HEADER_SIZE];
        let schema_json = serde_json::to_vec(&self.schema)?;
        if schema_json.len() > HEADER_SIZE - 16 {
            return Err(VectorLiteError::InvalidFile("schema too large for header".to_string()));
        }
        LittleEndian::write_u32(&mut buf[0..4], self.format_version);
        LittleEndian::write_u64(&mut buf[4..12], self.num_rows);
        LittleEndian::write_u32(&mut buf[12..16], schema_json.len() as u32);
        buf[16..16 + schema_json.len()].copy_from_slice(&schema_json);
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(VectorLiteError::InvalidFile("header too short".to_string()));
        }
        let format_version = LittleEndian::read_u32(&bytes[0..4]);
        let num_rows = LittleEndian::read_u64(&bytes[4..12]);
        let schema_len = LittleEndian::read_u32(&bytes[12..16]) as usize;
        if 16 + schema_len > HEADER_SIZE {
            return Err(VectorLiteError::InvalidFile("corrupt header schema length".to_string()));
        }
        let schema: Schema = serde_json::from_slice(&bytes[16..16 + schema_len])?;
        Ok(Self { format_version, num_rows, schema })
    }

    /// Patches only the `num_rows` field of an already-written header.
    pub fn encode_num_rows_patch(num_rows: u64) -> [u8; 8] {
        let mut raw = [0u8; 8];
        LittleEndian::write_u64(&mut raw, num_rows);
        raw
    }
}
