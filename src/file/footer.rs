//! Length-prefixed footer: per-column page index plus a fixed-width trailer
//! (spec §4.4, §6).

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::CodecTag;
use crate::error::{Result, VectorLiteError};

/// Identifies the format at end-of-file: ASCII "LANC" read as a little-endian
/// `u32`.
pub const MAGIC: u32 = 0x4C41_4E43;

#[derive(Debug, Clone)]
pub struct ColumnPageIndex {
    pub field_ordinal: u32,
    pub offset: u64,
    pub length: u64,
    pub codec_tag: CodecTag,
}

#[derive(Debug, Clone)]
pub struct Footer {
    pub columns: Vec<ColumnPageIndex>,
}

impl Footer {
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let mut field4 = [0u8; 4];
        let mut field8 = [0u8; 8];
        LittleEndian::write_u32(&mut field4, self.columns.len() as u32);
        body.extend_from_slice(&field4);
        for c in &self.columns {
            LittleEndian::write_u32(&mut field4, c.field_ordinal);
            body.extend_from_slice(&field4);
            LittleEndian::write_u64(&mut field8, c.offset);
            body.extend_from_slice(&field8);
            LittleEndian::write_u64(&mut field8, c.length);
            body.extend_from_slice(&field8);
            body.push(c.codec_tag as u8);
        }

        let mut out = body.clone();
        LittleEndian::write_u64(&mut field8, body.len() as u64);
        out.extend_from_slice(&field8);
        LittleEndian::write_u32(&mut field4, MAGIC);
        out.extend_from_slice(&field4);
        out
    }

    /// Decodes the footer body (without the trailer) given its byte length.
    pub fn decode_body(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(VectorLiteError::Truncated);
        }
        let num_columns = LittleEndian::read_u32(&bytes[0..4]) as usize;
        let mut pos = 4;
        let record_len = 4 + 8 + 8 + 1;
        let mut columns = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            if bytes.len() < pos + record_len {
                return Err(VectorLiteError::Truncated);
            }
            let field_ordinal = LittleEndian::read_u32(&bytes[pos..pos + 4]);
            pos += 4;
            let offset = LittleEndian::read_u64(&bytes[pos..pos + 8]);
            pos += 8;
            let length = LittleEndian::read_u64(&bytes[pos..pos + 8]);
            pos += 8;
            let codec_tag = CodecTag::from_byte(bytes[pos])?;
            pos += 1;
            columns.push(ColumnPageIndex { field_ordinal, offset, length, codec_tag });
        }
        Ok(Self { columns })
    }
}

/// Reads the fixed-width trailer `{ footer_length: u64, magic: u32 }` from
/// the last 12 bytes of the file.
pub fn decode_trailer(bytes: &[u8]) -> Result<u64> {
    if bytes.len() < 12 {
        return Err(VectorLiteError::Truncated);
    }
    let n = bytes.len();
    let footer_length = LittleEndian::read_u64(&bytes[n - 12..n - 4]);
    let magic = LittleEndian::read_u32(&bytes[n - 4..n]);
    if magic != MAGIC {
        return Err(VectorLiteError::InvalidFile("bad magic trailer".to_string()));
    }
    Ok(footer_length)
}
