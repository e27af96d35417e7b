//! HNSW construction parameters and the adaptive `M` / `ef_construction`
//! policy (spec §9 "Adaptive parameters").

use crate::distance::DistanceMetric;

#[derive(Debug, Clone)]
pub struct HnswParams {
    pub dimension: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub distance: DistanceMetric,
    /// `1 / ln(m)`, the level generation factor.
    pub m_l: f64,
}

impl HnswParams {
    pub fn new(dimension: usize, m: usize, ef_construction: usize, distance: DistanceMetric) -> Self {
        Self {
            dimension,
            m,
            ef_construction,
            distance,
            m_l: 1.0 / (m as f64).ln(),
        }
    }

    /// `Mmax(0) = 2M`, `Mmax(L > 0) = M`.
    pub fn mmax(&self, layer: usize) -> usize {
        if layer == 0 { 2 * self.m } else { self.m }
    }

    #[inline]
    pub fn sample_level(&self) -> usize {
        let r: f64 = rand::random();
        // r is in [0, 1); guard against ln(0.0) = -inf on the (astronomically
        // unlikely) exact-zero draw.
        let r = r.max(f64::MIN_POSITIVE);
        (-r.ln() * self.m_l).floor() as usize
    }
}

/// Given an expected dataset size, derives `M` and `ef_construction`:
/// `M = clamp(ceil(log2(E)), 8, 48)`, `ef_construction = max(100, 2M)`.
pub fn adaptive_params(expected_size: usize) -> (usize, usize) {
    let e = expected_size.max(1) as f64;
    let m = (e.log2().ceil() as i64).clamp(8, 48) as usize;
    let ef_construction = (2 * m).max(100);
    (m, ef_construction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_defaults_match_spec_example() {
        let (m, ef) = adaptive_params(10_000);
        assert_eq!(m, 14); // ceil(log2(10000)) = 14
        assert_eq!(ef, 100);
    }

    #[test]
    fn adaptive_clamps_to_floor_and_ceiling() {
        let (m_small, _) = adaptive_params(1);
        assert_eq!(m_small, 8);
        let (m_large, ef_large) = adaptive_params(10_000_000_000);
        assert_eq!(m_large, 34);
        assert_eq!(ef_large, 100.max(2 * m_large));
    }

    #[test]
    fn mmax_doubles_at_layer_zero() {
        let p = HnswParams::new(4, 16, 200, DistanceMetric::L2);
        assert_eq!(p.mmax(0), 32);
        assert_eq!(p.mmax(1), 16);
    }
}
