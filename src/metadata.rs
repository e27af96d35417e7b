//! User metadata: a heterogeneous tagged variant plus the comparison
//! operators filter predicates are built from (spec §9 "Dynamic metadata").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Array(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    In,
}

impl MetadataValue {
    /// Evaluates `self <op> other`. `Contains` requires both sides to be
    /// strings (substring test); `In` requires `other` to be an `Array` and
    /// tests membership of `self` within it. Operators across incompatible
    /// variants (e.g. ordering a `String` against an `I64`) return `false`.
    pub fn compare(&self, op: CompareOp, other: &MetadataValue) -> bool {
        match op {
            CompareOp::Eq => self == other,
            CompareOp::Ne => self != other,
            CompareOp::Gt => self.partial_cmp_numeric_or_string(other).is_some_and(|o| o.is_gt()),
            CompareOp::Gte => self.partial_cmp_numeric_or_string(other).is_some_and(|o| o.is_ge()),
            CompareOp::Lt => self.partial_cmp_numeric_or_string(other).is_some_and(|o| o.is_lt()),
            CompareOp::Lte => self.partial_cmp_numeric_or_string(other).is_some_and(|o| o.is_le()),
            CompareOp::Contains => match (self, other) {
                (MetadataValue::String(haystack), MetadataValue::String(needle)) => haystack.contains(needle.as_str()),
                _ => false,
            },
            CompareOp::In => match other {
                MetadataValue::Array(items) => items.contains(self),
                _ => false,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::I64(v) => Some(*v as f64),
            MetadataValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    fn partial_cmp_numeric_or_string(&self, other: &MetadataValue) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (MetadataValue::String(a), MetadataValue::String(b)) => a.partial_cmp(b),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

/// Opaque predicate over a document's metadata map, consumed by
/// `search_with_filter` (spec §1, §4.7).
pub type FilterPredicate = Box<dyn Fn(&BTreeMap<String, MetadataValue>) -> bool + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cross_type_comparison() {
        let a = MetadataValue::I64(3);
        let b = MetadataValue::F64(3.5);
        assert!(a.compare(CompareOp::Lt, &b));
        assert!(!a.compare(CompareOp::Gt, &b));
    }

    #[test]
    fn string_contains() {
        let hay = MetadataValue::String("hello world".to_string());
        let needle = MetadataValue::String("world".to_string());
        assert!(hay.compare(CompareOp::Contains, &needle));
    }

    #[test]
    fn array_membership() {
        let needle = MetadataValue::String("A".to_string());
        let haystack = MetadataValue::Array(vec![
            MetadataValue::String("A".to_string()),
            MetadataValue::String("B".to_string()),
        ]);
        assert!(needle.compare(CompareOp::In, &haystack));
    }

    #[test]
    fn incompatible_ordering_is_false() {
        let s = MetadataValue::String("x".to_string());
        let n = MetadataValue::I64(1);
        assert!(!s.compare(CompareOp::Gt, &n));
    }
}
