pub mod buffer;
pub mod builder;
pub mod list;
pub mod primitive;
pub mod string;

pub use buffer::Buffer;
pub use list::{FixedSizeListArray, ListArray};
pub use primitive::{Float32Array, Float64Array, Int32Array, Int64Array};
pub use string::Utf8Array;

/// A column's decoded in-memory representation, used as the unit exchanged
/// between the codec layer and the file reader/writer.
#[derive(Debug, Clone)]
pub enum ColumnArray {
    Int32(Int32Array),
    Int64(Int64Array),
    Float32(Float32Array),
    Float64(Float64Array),
    FixedSizeList(FixedSizeListArray),
    List(ListArray),
    Utf8(Utf8Array),
}

impl ColumnArray {
    pub fn len(&self) -> usize {
        match self {
            ColumnArray::Int32(a) => a.len(),
            ColumnArray::Int64(a) => a.len(),
            ColumnArray::Float32(a) => a.len(),
            ColumnArray::Float64(a) => a.len(),
            ColumnArray::FixedSizeList(a) => a.len(),
            ColumnArray::List(a) => a.len(),
            ColumnArray::Utf8(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
