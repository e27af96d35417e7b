//! Builders that accumulate values and transfer ownership to a new array on
//! `finish` (spec §4.1). `append_null` lazily creates the bitmap on first use
//! and retroactively marks every prior append as valid.

use crate::array::primitive::{Float32Array, Float64Array, Int32Array, Int64Array};
use crate::bitmap::Bitmap;

macro_rules! primitive_builder {
    ($name:ident, $array:ident, $elem:ty) => {
        #[derive(Debug, Default)]
        pub struct $name {
            values: Vec<$elem>,
            nulls: Option<Bitmap>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn append_value(&mut self, v: $elem) {
                if let Some(nulls) = self.nulls.as_mut() {
                    nulls.resize(nulls.len() + 1);
                    nulls.set(nulls.len() - 1);
                }
                self.values.push(v);
            }

            /// Appends a null. On first call, lazily allocates a bitmap and
            /// retroactively marks every value appended so far as valid.
            pub fn append_null(&mut self) {
                if self.nulls.is_none() {
                    let mut bm = Bitmap::new(self.values.len());
                    bm.set_all();
                    self.nulls = Some(bm);
                }
                let nulls = self.nulls.as_mut().unwrap();
                nulls.resize(nulls.len() + 1);
                // newly resized bit defaults to 0 (invalid), which is what we want.
                self.values.push(Default::default());
            }

            pub fn len(&self) -> usize {
                self.values.len()
            }

            pub fn is_empty(&self) -> bool {
                self.values.is_empty()
            }

            pub fn finish(&mut self) -> $array {
                let values = std::mem::take(&mut self.values);
                let nulls = self.nulls.take();
                $array::new(values, nulls)
            }
        }
    };
}

primitive_builder!(Int32Builder, Int32Array, i32);
primitive_builder!(Int64Builder, Int64Array, i64);
primitive_builder!(Float32Builder, Float32Array, f32);
primitive_builder!(Float64Builder, Float64Array, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_null_marks_prior_valid() {
        let mut b = Int32Builder::new();
        b.append_value(1);
        b.append_value(2);
        b.append_null();
        b.append_value(4);
        let arr = b.finish();
        assert_eq!(arr.get(0), Some(1));
        assert_eq!(arr.get(1), Some(2));
        assert_eq!(arr.get(2), None);
        assert_eq!(arr.get(3), Some(4));
    }

    #[test]
    fn finish_resets_builder() {
        let mut b = Float64Builder::new();
        b.append_value(1.0);
        let _ = b.finish();
        assert_eq!(b.len(), 0);
    }
}
