//! List arrays: `FixedSizeListArray` (vectors) and `ListArray` (neighbor id
//! lists), both over a primitive leaf element type (spec §4.1).

use bytemuck::cast_slice;

use crate::array::buffer::Buffer;
use crate::bitmap::Bitmap;
use crate::schema::DataTypeLeaf;

fn push_leaf(buf: &mut Buffer, leaf: DataTypeLeaf, raw: &[u8]) {
    match leaf {
        DataTypeLeaf::Int32 => buf.push_i32_le(i32::from_le_bytes(raw.try_into().unwrap())),
        DataTypeLeaf::Int64 => buf.push_i64_le(i64::from_le_bytes(raw.try_into().unwrap())),
        DataTypeLeaf::Float32 => buf.push_f32_le(f32::from_le_bytes(raw.try_into().unwrap())),
        DataTypeLeaf::Float64 => buf.push_f64_le(f64::from_le_bytes(raw.try_into().unwrap())),
    }
}

/// `len = underlying_len / size`. Used for the vector column
/// (`fixed_size_list<f32, D>`).
#[derive(Debug, Clone)]
pub struct FixedSizeListArray {
    values: Buffer,
    element: DataTypeLeaf,
    size: usize,
    nulls: Option<Bitmap>,
    len: usize,
}

impl FixedSizeListArray {
    /// Builds from rows of little-endian element bytes; every row must have
    /// exactly `size` elements.
    pub fn from_rows(rows: Vec<Vec<u8>>, element: DataTypeLeaf, size: usize, nulls: Option<Bitmap>) -> Self {
        let width = element.byte_width();
        let mut values = Buffer::new();
        let len = rows.len();
        for row in &rows {
            debug_assert_eq!(row.len(), width * size);
            for chunk in row.chunks_exact(width) {
                push_leaf(&mut values, element, chunk);
            }
        }
        Self {
            values,
            element,
            size,
            nulls,
            len,
        }
    }

    /// Builds the vector column directly from `f32` rows via a zero-copy
    /// byte cast (spec §4.1's "byte-exact" requirement), the same
    /// reinterpret-as-bytes move the teacher uses for its own vector
    /// encoding. Every target this crate ships for is little-endian, so the
    /// native-order cast agrees with the little-endian file format.
    pub fn from_f32_rows(rows: Vec<Vec<f32>>, size: usize) -> Self {
        let mut values = Buffer::new();
        let len = rows.len();
        for row in &rows {
            debug_assert_eq!(row.len(), size);
            values.extend_from_slice(cast_slice::<f32, u8>(row));
        }
        Self {
            values,
            element: DataTypeLeaf::Float32,
            size,
            nulls: None,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn element(&self) -> DataTypeLeaf {
        self.element
    }

    pub fn values(&self) -> &Buffer {
        &self.values
    }

    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len, "index {i} out of range (len {})", self.len);
        self.nulls.as_ref().is_none_or(|b| b.is_set(i))
    }

    pub fn get_f32_row(&self, i: usize) -> Option<Vec<f32>> {
        assert_eq!(self.element, DataTypeLeaf::Float32);
        if !self.is_valid(i) {
            return None;
        }
        let start = i * self.size;
        Some((start..start + self.size).map(|idx| self.values.get_f32_le(idx)).collect())
    }

    pub fn get_i32_row(&self, i: usize) -> Option<Vec<i32>> {
        assert_eq!(self.element, DataTypeLeaf::Int32);
        if !self.is_valid(i) {
            return None;
        }
        let start = i * self.size;
        Some((start..start + self.size).map(|idx| self.values.get_i32_le(idx)).collect())
    }
}

/// Variable-length list array; `offsets` has length `N+1` and is strictly
/// non-decreasing. Used for the HNSW graph's `neighbors: list<i32>` column.
#[derive(Debug, Clone)]
pub struct ListArray {
    offsets: Vec<i32>,
    values: Buffer,
    element: DataTypeLeaf,
    nulls: Option<Bitmap>,
}

impl ListArray {
    pub fn from_rows(rows: Vec<Vec<i32>>, nulls: Option<Bitmap>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut values = Buffer::new();
        offsets.push(0);
        let mut running = 0i32;
        for row in &rows {
            for &v in row {
                values.push_i32_le(v);
            }
            running += row.len() as i32;
            offsets.push(running);
        }
        Self {
            offsets,
            values,
            element: DataTypeLeaf::Int32,
            nulls,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn values(&self) -> &Buffer {
        &self.values
    }

    pub fn element(&self) -> DataTypeLeaf {
        self.element
    }

    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len(), "index {i} out of range (len {})", self.len());
        self.nulls.as_ref().is_none_or(|b| b.is_set(i))
    }

    pub fn get_i32_row(&self, i: usize) -> Option<Vec<i32>> {
        if !self.is_valid(i) {
            return None;
        }
        let start = self.offsets[i] as usize;
        let end = self.offsets[i + 1] as usize;
        Some((start..end).map(|idx| self.values.get_i32_le(idx)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_size_list_roundtrip() {
        let arr = FixedSizeListArray::from_f32_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2);
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get_f32_row(0), Some(vec![1.0, 2.0]));
        assert_eq!(arr.get_f32_row(1), Some(vec![3.0, 4.0]));
    }

    #[test]
    fn list_array_offsets_nondecreasing() {
        let arr = ListArray::from_rows(vec![vec![1, 2, 3], vec![], vec![4]], None);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get_i32_row(0), Some(vec![1, 2, 3]));
        assert_eq!(arr.get_i32_row(1), Some(vec![]));
        assert_eq!(arr.get_i32_row(2), Some(vec![4]));
        assert!(arr.offsets().windows(2).all(|w| w[0] <= w[1]));
    }
}
