//! Null-aware, fixed-width primitive arrays (spec §4.1).

use crate::array::buffer::Buffer;
use crate::bitmap::Bitmap;

macro_rules! primitive_array {
    ($name:ident, $elem:ty, $push:ident, $get:ident) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            values: Buffer,
            nulls: Option<Bitmap>,
            len: usize,
        }

        impl $name {
            pub fn new(values: Vec<$elem>, nulls: Option<Bitmap>) -> Self {
                let len = values.len();
                let mut buf = Buffer::new();
                for v in values {
                    buf.$push(v);
                }
                Self {
                    values: buf,
                    nulls,
                    len,
                }
            }

            pub fn len(&self) -> usize {
                self.len
            }

            pub fn is_empty(&self) -> bool {
                self.len == 0
            }

            pub fn is_valid(&self, i: usize) -> bool {
                assert!(i < self.len, "index {i} out of range (len {})", self.len);
                self.nulls.as_ref().is_none_or(|b| b.is_set(i))
            }

            /// Returns `None` for a null element, `Some` otherwise. Panics
            /// (does not return a `Result`) on out-of-range access, per the
            /// spec's "programming error" carve-out for index bounds.
            pub fn get(&self, i: usize) -> Option<$elem> {
                if !self.is_valid(i) {
                    return None;
                }
                Some(self.values.$get(i))
            }

            pub fn values(&self) -> &Buffer {
                &self.values
            }

            pub fn nulls(&self) -> Option<&Bitmap> {
                self.nulls.as_ref()
            }

            pub fn has_nulls(&self) -> bool {
                self.nulls.as_ref().is_some_and(|b| b.popcount() != self.len)
            }
        }
    };
}

primitive_array!(Int32Array, i32, push_i32_le, get_i32_le);
primitive_array!(Int64Array, i64, push_i64_le, get_i64_le);
primitive_array!(Float32Array, f32, push_f32_le, get_f32_le);
primitive_array!(Float64Array, f64, push_f64_le, get_f64_le);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_nulls() {
        let mut nulls = Bitmap::new(3);
        nulls.set(0);
        nulls.set(2);
        let arr = Int32Array::new(vec![1, 0, 3], Some(nulls));
        assert_eq!(arr.get(0), Some(1));
        assert_eq!(arr.get(1), None);
        assert_eq!(arr.get(2), Some(3));
        assert!(arr.has_nulls());
    }

    #[test]
    fn float64_no_nulls_roundtrip() {
        let arr = Float64Array::new(vec![1.5, f64::NAN, -2.0], None);
        assert_eq!(arr.get(0), Some(1.5));
        assert!(arr.get(1).unwrap().is_nan());
        assert_eq!(arr.get(2), Some(-2.0));
        assert!(!arr.has_nulls());
    }

    #[test]
    #[should_panic]
    fn out_of_range_panics() {
        let arr = Int32Array::new(vec![1], None);
        arr.get(1);
    }
}
