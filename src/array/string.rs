//! UTF-8 string / variable-length binary array (spec §4.1).

use crate::bitmap::Bitmap;

#[derive(Debug, Clone)]
pub struct Utf8Array {
    offsets: Vec<i32>,
    data: Vec<u8>,
    nulls: Option<Bitmap>,
}

impl Utf8Array {
    pub fn from_values(values: Vec<Option<String>>) -> Self {
        let mut offsets = Vec::with_capacity(values.len() + 1);
        let mut data = Vec::new();
        let mut nulls = Bitmap::new(values.len());
        offsets.push(0);
        let mut running = 0i32;
        let mut any_null = false;
        for (i, v) in values.iter().enumerate() {
            match v {
                Some(s) => {
                    data.extend_from_slice(s.as_bytes());
                    running += s.len() as i32;
                    nulls.set(i);
                }
                None => any_null = true,
            }
            offsets.push(running);
        }
        Self {
            offsets,
            data,
            nulls: if any_null { Some(nulls) } else { None },
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

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len(), "index {i} out of range (len {})", self.len());
        self.nulls.as_ref().is_none_or(|b| b.is_set(i))
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        if !self.is_valid(i) {
            return None;
        }
        let start = self.offsets[i] as usize;
        let end = self.offsets[i + 1] as usize;
        Some(std::str::from_utf8(&self.data[start..end]).expect("utf8 array holds valid utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_nulls() {
        let arr = Utf8Array::from_values(vec![Some("a".into()), None, Some("bcd".into())]);
        assert_eq!(arr.get(0), Some("a"));
        assert_eq!(arr.get(1), None);
        assert_eq!(arr.get(2), Some("bcd"));
    }
}
