//! Distance metrics over `f32` vectors (spec §4.5.1): L2 (squared), cosine,
//! and negated inner product, all satisfying `dist(x, x) = 0`.

const ZERO_NORM_EPSILON: f32 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DistanceMetric {
    L2,
    Cosine,
    InnerProduct,
}

impl DistanceMetric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => l2_squared(a, b),
            DistanceMetric::Cosine => cosine(a, b),
            DistanceMetric::InnerProduct => -dot(a, b),
        }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// `1 - dot(a, b) / (|a| |b|)`. Returns `1.0` if either norm is below
/// `1e-12`, rather than dividing by (near) zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a < ZERO_NORM_EPSILON || norm_b < ZERO_NORM_EPSILON {
        return 1.0;
    }
    1.0 - dot(a, b) / (norm_a * norm_b)
}
