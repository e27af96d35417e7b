//! Packed, byte-aligned null bitmap.
//!
//! Storage is byte-packed LSB-first: bit `i` lives in byte `i / 8`, bit
//! position `i % 8` counting from the least significant bit.

/// A growable bit sequence. Bit `i` set means "valid" when used as a null
/// bitmap (spec's convention), but the type itself is a plain bitset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitmap {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len.div_ceil(8)],
            len,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, len: usize) -> Self {
        debug_assert!(bytes.len() >= len.div_ceil(8));
        Self { bytes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn check(&self, i: usize) {
        assert!(i < self.len, "bitmap index {i} out of range (len {})", self.len);
    }

    pub fn is_set(&self, i: usize) -> bool {
        self.check(i);
        let byte = self.bytes[i / 8];
        (byte >> (i % 8)) & 1 == 1
    }

    pub fn set(&mut self, i: usize) {
        self.check(i);
        self.bytes[i / 8] |= 1 << (i % 8);
    }

    pub fn clear(&mut self, i: usize) {
        self.check(i);
        self.bytes[i / 8] &= !(1 << (i % 8));
    }

    pub fn set_all(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0xFF);
        self.clear_tail_padding();
    }

    pub fn clear_all(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }

    /// Zeroes the padding bits past `len` in the final byte so `popcount`
    /// and byte-exact comparisons aren't polluted by set_all's spillover.
    fn clear_tail_padding(&mut self) {
        let used_bits = self.len % 8;
        if used_bits != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1 << used_bits) - 1;
            }
        }
    }

    pub fn popcount(&self) -> usize {
        let full_bytes = self.len / 8;
        let mut count: usize = self.bytes[..full_bytes]
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum();
        let rem = self.len % 8;
        if rem != 0 {
            let mask = (1u8 << rem) - 1;
            count += (self.bytes[full_bytes] & mask).count_ones() as usize;
        }
        count
    }

    /// Resizes to `new_len`, preserving lower-index bits on grow and
    /// truncating (and zeroing padding) on shrink.
    pub fn resize(&mut self, new_len: usize) {
        self.bytes.resize(new_len.div_ceil(8), 0);
        self.len = new_len;
        self.clear_tail_padding();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_roundtrip() {
        let mut bm = Bitmap::new(17);
        assert!(!bm.is_set(0));
        bm.set(0);
        bm.set(16);
        assert!(bm.is_set(0));
        assert!(bm.is_set(16));
        assert_eq!(bm.popcount(), 2);
        bm.clear(0);
        assert!(!bm.is_set(0));
        assert_eq!(bm.popcount(), 1);
    }

    #[test]
    fn popcount_matches_brute_force() {
        let mut bm = Bitmap::new(100);
        for i in (0..100).step_by(3) {
            bm.set(i);
        }
        let expected = (0..100).filter(|i| i % 3 == 0).count();
        assert_eq!(bm.popcount(), expected);
    }

    #[test]
    fn set_all_respects_len() {
        let mut bm = Bitmap::new(10);
        bm.set_all();
        assert_eq!(bm.popcount(), 10);
        assert_eq!(bm.as_bytes()[1] & 0b1111_1100, 0);
    }

    #[test]
    fn resize_grow_preserves_truncate_zeroes() {
        let mut bm = Bitmap::new(4);
        bm.set_all();
        bm.resize(12);
        assert!(bm.is_set(0));
        assert!(!bm.is_set(8));
        bm.resize(3);
        assert_eq!(bm.len(), 3);
        assert_eq!(bm.popcount(), 3);
    }

    #[test]
    #[should_panic]
    fn out_of_range_panics() {
        let bm = Bitmap::new(4);
        bm.is_set(4);
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn popcount_and_is_set_match_brute_force(flags in prop::collection::vec(any::<bool>(), 1..200)) {
            let mut bm = Bitmap::new(flags.len());
            for (i, &flag) in flags.iter().enumerate() {
                if flag {
                    bm.set(i);
                }
            }
            let expected = flags.iter().filter(|&&f| f).count();
            prop_assert_eq!(bm.popcount(), expected);
            for (i, &flag) in flags.iter().enumerate() {
                prop_assert_eq!(bm.is_set(i), flag);
            }
        }
    }
}
