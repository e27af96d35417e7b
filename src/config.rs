//! Collection configuration surface (spec §6), mirroring the teacher's
//! `HNSWConfig::new` pattern of a clamping, deriving constructor.

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::hnsw::adaptive_params;

const DEFAULT_DIMENSION: usize = 128;
const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_EXPECTED_SIZE: usize = 10_000;
const DEFAULT_COMPRESSION_LEVEL: u8 = 3;
const DEFAULT_PAGE_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub dimension: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub distance: DistanceMetric,
    pub adaptive: bool,
    pub expected_size: usize,
    pub compression_level: u8,
    pub page_size: usize,
    pub auto_save_interval_s: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self::new(CollectionConfigBuilder::default())
    }
}

/// Builder-style input to [`CollectionConfig::new`]: every field optional,
/// defaulting exactly as spec §6's configuration table states.
#[derive(Debug, Clone, Default)]
pub struct CollectionConfigBuilder {
    pub dimension: Option<usize>,
    pub m: Option<usize>,
    pub ef_construction: Option<usize>,
    pub distance: Option<DistanceMetric>,
    pub adaptive: Option<bool>,
    pub expected_size: Option<usize>,
    pub compression_level: Option<u8>,
    pub page_size: Option<usize>,
    pub auto_save_interval_s: Option<u64>,
}

impl CollectionConfig {
    /// Setting `m` or `ef_construction` explicitly disables the adaptive
    /// policy for both (spec §9 "Adaptive parameters").
    pub fn new(input: CollectionConfigBuilder) -> Self {
        let dimension = input.dimension.unwrap_or(DEFAULT_DIMENSION).max(1);
        let expected_size = input.expected_size.unwrap_or(DEFAULT_EXPECTED_SIZE);
        let explicit_hnsw_params = input.m.is_some() || input.ef_construction.is_some();
        let adaptive = input.adaptive.unwrap_or(true) && !explicit_hnsw_params;

        let (m, ef_construction) = if adaptive {
            adaptive_params(expected_size)
        } else {
            (input.m.unwrap_or(DEFAULT_M), input.ef_construction.unwrap_or(DEFAULT_EF_CONSTRUCTION))
        };

        Self {
            dimension,
            m,
            ef_construction,
            distance: input.distance.unwrap_or(DistanceMetric::L2),
            adaptive,
            expected_size,
            compression_level: input.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL),
            page_size: input.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            auto_save_interval_s: input.auto_save_interval_s.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = CollectionConfig::default();
        assert_eq!(cfg.dimension, 128);
        assert_eq!(cfg.distance, DistanceMetric::L2);
        assert!(cfg.adaptive);
        assert_eq!(cfg.auto_save_interval_s, 0);
    }

    #[test]
    fn explicit_m_disables_adaptive() {
        let cfg = CollectionConfig::new(CollectionConfigBuilder { m: Some(24), ..Default::default() });
        assert!(!cfg.adaptive);
        assert_eq!(cfg.m, 24);
        assert_eq!(cfg.ef_construction, DEFAULT_EF_CONSTRUCTION);
    }

    #[test]
    fn adaptive_scales_with_expected_size() {
        let cfg = CollectionConfig::new(CollectionConfigBuilder { expected_size: Some(10_000), ..Default::default() });
        assert_eq!(cfg.m, 14);
        assert_eq!(cfg.ef_construction, 100);
    }
}
