//! Page header framing shared by the plain and dictionary codecs (spec §4.3).

use bytemuck::{bytes_of, pod_read_unaligned};

use crate::error::{Result, VectorLiteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CodecTag {
    Plain = 0,
    Dictionary = 1,
}

impl CodecTag {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(CodecTag::Plain),
            1 => Ok(CodecTag::Dictionary),
            _ => Err(VectorLiteError::InvalidFile(format!("unknown codec tag {b}"))),
        }
    }
}

/// `{ codec, value-count, optional codec metadata }` — the page header named
/// in spec §3. `codec_meta` is only non-empty for list pages, where it holds
/// the serialized offsets sub-page.
#[derive(Debug, Clone)]
pub struct PageHeader {
    pub codec: CodecTag,
    pub value_count: u32,
}

impl PageHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5);
        out.push(self.codec as u8);
        // `value_count` is native-endian here, matching the teacher's
        // `bytes_of`/`pod_read_unaligned` header framing (host is little-endian
        // on every platform this crate ships for).
        out.extend_from_slice(bytes_of(&self.value_count));
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < 5 {
            return Err(VectorLiteError::Truncated);
        }
        let codec = CodecTag::from_byte(bytes[0])?;
        let value_count: u32 = pod_read_unaligned(&bytes[1..5]);
        Ok((Self { codec, value_count }, &bytes[5..]))
    }
}
