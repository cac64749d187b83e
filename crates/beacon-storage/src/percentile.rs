use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentile ranks kept fresh for histogram and summary metrics.
pub const TRACKED_PERCENTILES: [(&str, f64); 4] =
    [("p50", 0.50), ("p90", 0.90), ("p95", 0.95), ("p99", 0.99)];

/// Nearest-rank percentile over an already sorted slice.
///
/// Returns `sorted[ceil(n * k) - 1]`, with the index clamped to `[0, n-1]`.
///
/// # Examples
///
/// ```
/// use beacon_storage::percentile::nearest_rank;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(nearest_rank(&sorted, 0.5), Some(2.0));
/// assert_eq!(nearest_rank(&sorted, 0.99), Some(4.0));
/// assert_eq!(nearest_rank(&[], 0.5), None);
/// ```
pub fn nearest_rank(sorted: &[f64], k: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (n as f64 * k).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    Some(sorted[idx])
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Percentiles {
    /// Sort a copy of `values` and compute the tracked percentiles.
    /// `None` when there are no samples.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        Some(Self {
            p50: nearest_rank(sorted, 0.50)?,
            p90: nearest_rank(sorted, 0.90)?,
            p95: nearest_rank(sorted, 0.95)?,
            p99: nearest_rank(sorted, 0.99)?,
        })
    }

    pub fn to_map(self) -> BTreeMap<String, f64> {
        let values = [self.p50, self.p90, self.p95, self.p99];
        TRACKED_PERCENTILES
            .iter()
            .zip(values)
            .map(|((key, _), v)| (key.to_string(), v))
            .collect()
    }
}
