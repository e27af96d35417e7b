//! Dictionary codec: byte-exact header + first-appearance dictionary +
//! index array (spec §4.3).
//!
//! Floating-point dictionary equality is on bit pattern, not numeric value,
//! so two identically-bit-patterned NaNs share a slot.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use bytemuck::pod_read_unaligned;

use crate::array::{ColumnArray, Float32Array, Float64Array, Int32Array, Int64Array};
use crate::error::{Result, VectorLiteError};
use crate::schema::DataTypeLeaf;

const HEADER_LEN: usize = 10;

fn leaf_raw_bytes(array: &ColumnArray, i: usize) -> Option<[u8; 8]> {
    let mut out = [0u8; 8];
    match array {
        ColumnArray::Int32(a) => LittleEndian::write_i32(&mut out[..4], a.get(i)?),
        ColumnArray::Float32(a) => LittleEndian::write_u32(&mut out[..4], a.get(i)?.to_bits()),
        ColumnArray::Int64(a) => LittleEndian::write_i64(&mut out, a.get(i)?),
        ColumnArray::Float64(a) => LittleEndian::write_u64(&mut out, a.get(i)?.to_bits()),
        _ => return None,
    }
    Some(out)
}

fn value_size_of(array: &ColumnArray) -> Option<u8> {
    match array {
        ColumnArray::Int32(_) | ColumnArray::Float32(_) => Some(4),
        ColumnArray::Int64(_) | ColumnArray::Float64(_) => Some(8),
        _ => None,
    }
}

fn has_any_null(array: &ColumnArray) -> bool {
    match array {
        ColumnArray::Int32(a) => (0..a.len()).any(|i| a.get(i).is_none()),
        ColumnArray::Int64(a) => (0..a.len()).any(|i| a.get(i).is_none()),
        ColumnArray::Float32(a) => (0..a.len()).any(|i| a.get(i).is_none()),
        ColumnArray::Float64(a) => (0..a.len()).any(|i| a.get(i).is_none()),
        _ => false,
    }
}

/// Encodes the payload only (the caller writes the [`crate::codec::page::PageHeader`] framing).
pub fn encode(array: &ColumnArray) -> Result<Vec<u8>> {
    let value_count = array.len();
    if value_count == 0 {
        return Err(VectorLiteError::EmptyArray);
    }
    if has_any_null(array) {
        return Err(VectorLiteError::NullNotSupported);
    }
    let value_size = value_size_of(array).ok_or_else(|| {
        VectorLiteError::InvalidFile("unsupported-type for dictionary encoding".to_string())
    })?;

    let mut dict_order: Vec<[u8; 8]> = Vec::new();
    let mut dict_index: HashMap<[u8; 8], u32> = HashMap::new();
    let mut indices: Vec<u32> = Vec::with_capacity(value_count);

    for i in 0..value_count {
        let raw = leaf_raw_bytes(array, i).expect("validated non-null fixed-width array");
        let idx = *dict_index.entry(raw).or_insert_with(|| {
            dict_order.push(raw);
            (dict_order.len() - 1) as u32
        });
        indices.push(idx);
    }

    let num_entries = dict_order.len() as u32;
    let index_size: u8 = if num_entries <= 65_535 { 2 } else { 4 };

    let mut out = Vec::with_capacity(
        HEADER_LEN + dict_order.len() * value_size as usize + indices.len() * index_size as usize,
    );
    out.push(value_size);
    let mut field = [0u8; 4];
    LittleEndian::write_u32(&mut field, num_entries);
    out.extend_from_slice(&field);
    LittleEndian::write_u32(&mut field, value_count as u32);
    out.extend_from_slice(&field);
    out.push(index_size);

    for entry in &dict_order {
        out.extend_from_slice(&entry[..value_size as usize]);
    }
    for idx in &indices {
        if index_size == 2 {
            let mut raw = [0u8; 2];
            LittleEndian::write_u16(&mut raw, *idx as u16);
            out.extend_from_slice(&raw);
        } else {
            let mut raw = [0u8; 4];
            LittleEndian::write_u32(&mut raw, *idx);
            out.extend_from_slice(&raw);
        }
    }

    Ok(out)
}

/// Decodes a dictionary page, producing an array of the requested leaf type.
pub fn decode(bytes: &[u8], expected: DataTypeLeaf) -> Result<ColumnArray> {
    if bytes.len() < HEADER_LEN {
        return Err(VectorLiteError::Truncated);
    }
    let value_size = bytes[0];
    let num_entries = LittleEndian::read_u32(&bytes[1..5]);
    let num_values = LittleEndian::read_u32(&bytes[5..9]);
    let index_size = bytes[9];

    if value_size != 4 && value_size != 8 {
        return Err(VectorLiteError::InvalidValueSize(value_size));
    }
    if index_size != 2 && index_size != 4 {
        return Err(VectorLiteError::InvalidIndexSize(index_size));
    }
    if expected.byte_width() != value_size as usize {
        return Err(VectorLiteError::TypeMismatch);
    }

    let dict_bytes_len = num_entries as usize * value_size as usize;
    let index_bytes_len = num_values as usize * index_size as usize;
    if bytes.len() < HEADER_LEN + dict_bytes_len + index_bytes_len {
        return Err(VectorLiteError::Truncated);
    }

    let dict_start = HEADER_LEN;
    let index_start = dict_start + dict_bytes_len;

    let mut indices = Vec::with_capacity(num_values as usize);
    for i in 0..num_values as usize {
        let idx = if index_size == 2 {
            LittleEndian::read_u16(&bytes[index_start + i * 2..index_start + i * 2 + 2]) as u32
        } else {
            LittleEndian::read_u32(&bytes[index_start + i * 4..index_start + i * 4 + 4])
        };
        if idx >= num_entries {
            return Err(VectorLiteError::InvalidIndex { index: idx, num_entries });
        }
        indices.push(idx);
    }

    let dict_entry = |e: u32| -> &[u8] {
        let start = dict_start + e as usize * value_size as usize;
        &bytes[start..start + value_size as usize]
    };

    // `pod_read_unaligned` reads in the host's native byte order, matching
    // the teacher's `node.rs` header decoding; every target this crate ships
    // for is little-endian, so this agrees with the little-endian bytes
    // `leaf_raw_bytes` wrote on encode.
    let array = match expected {
        DataTypeLeaf::Int32 => ColumnArray::Int32(Int32Array::new(
            indices.iter().map(|&e| pod_read_unaligned::<i32>(dict_entry(e))).collect(),
            None,
        )),
        DataTypeLeaf::Int64 => ColumnArray::Int64(Int64Array::new(
            indices.iter().map(|&e| pod_read_unaligned::<i64>(dict_entry(e))).collect(),
            None,
        )),
        DataTypeLeaf::Float32 => ColumnArray::Float32(Float32Array::new(
            indices
                .iter()
                .map(|&e| f32::from_bits(pod_read_unaligned::<u32>(dict_entry(e))))
                .collect(),
            None,
        )),
        DataTypeLeaf::Float64 => ColumnArray::Float64(Float64Array::new(
            indices
                .iter()
                .map(|&e| f64::from_bits(pod_read_unaligned::<u64>(dict_entry(e))))
                .collect(),
            None,
        )),
    };
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_round_trip() {
        let arr = ColumnArray::Int32(Int32Array::new(vec![100, 200, 100, 300, 200, 100], None));
        let bytes = encode(&arr).unwrap();
        assert_eq!(bytes[0], 4); // value_size
        let num_entries = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
        assert_eq!(num_entries, 3);
        let num_values = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
        assert_eq!(num_values, 6);
        assert_eq!(bytes[9], 2); // index_size

        let decoded = decode(&bytes, DataTypeLeaf::Int32).unwrap();
        match decoded {
            ColumnArray::Int32(a) => {
                let values: Vec<i32> = (0..a.len()).map(|i| a.get(i).unwrap()).collect();
                assert_eq!(values, vec![100, 200, 100, 300, 200, 100]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn corrupted_index_detected() {
        let arr = ColumnArray::Int32(Int32Array::new(vec![100, 200, 100, 300, 200, 100], None));
        let mut bytes = encode(&arr).unwrap();
        let index_start = HEADER_LEN + 3 * 4;
        bytes[index_start] = 5; // points at non-existent entry 5
        bytes[index_start + 1] = 0;
        let err = decode(&bytes, DataTypeLeaf::Int32).unwrap_err();
        assert!(matches!(err, VectorLiteError::InvalidIndex { .. }));
    }

    #[test]
    fn empty_array_rejected() {
        let arr = ColumnArray::Int32(Int32Array::new(vec![], None));
        assert!(matches!(encode(&arr), Err(VectorLiteError::EmptyArray)));
    }

    #[test]
    fn nulls_rejected() {
        let mut nulls = crate::bitmap::Bitmap::new(2);
        nulls.set(0);
        let arr = ColumnArray::Int32(Int32Array::new(vec![1, 0], Some(nulls)));
        assert!(matches!(encode(&arr), Err(VectorLiteError::NullNotSupported)));
    }

    #[test]
    fn large_dictionary_uses_4_byte_indices() {
        let values: Vec<i32> = (0..70_000).collect();
        let arr = ColumnArray::Int32(Int32Array::new(values, None));
        let bytes = encode(&arr).unwrap();
        assert_eq!(bytes[9], 4);
    }

    #[test]
    fn nan_bit_pattern_dedup() {
        let a = f32::NAN;
        let b = f32::from_bits(f32::NAN.to_bits() ^ 1); // different NaN payload
        let arr = ColumnArray::Float32(Float32Array::new(vec![a, a, b], None));
        let bytes = encode(&arr).unwrap();
        let num_entries = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
        assert_eq!(num_entries, 2);
    }
}
