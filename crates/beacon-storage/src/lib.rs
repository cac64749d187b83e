//! Bounded in-memory time-series storage for named metrics.
//!
//! [`engine::InMemoryStore`] keeps one FIFO-bounded series per metric name,
//! each behind its own lock, so concurrent writers to different metrics never
//! contend beyond the map lookup. Derived statistics (min/max/avg, totals and
//! nearest-rank percentiles) are refreshed on every write.

pub mod engine;
pub mod error;
pub mod percentile;
mod series;


use chrono::{DateTime, Utc};
use beacon_common::types::Labels;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use engine::InMemoryStore;
pub use error::StorageError;

/// Default number of retained data points per metric.
pub const DEFAULT_MAX_DATA_POINTS: usize = 1000;

/// Filter for [`InMemoryStore::query`].
///
/// Every set field narrows the result: `names` selects metrics, the time
/// range (inclusive) and `labels` select data points, and `limit` keeps the
/// most recent points per metric.
///
/// # Examples
///
/// ```
/// use beacon_storage::MetricFilter;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let filter = MetricFilter {
///     names: Some(vec!["http_request_duration_ms".into()]),
///     start_time: Some(now - Duration::hours(1)),
///     end_time: Some(now),
///     ..Default::default()
/// };
/// assert!(filter.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricFilter {
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl MetricFilter {
    pub fn validate(&self) -> error::Result<()> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(StorageError::InvalidFilter(format!(
                    "start_time {start} is after end_time {end}"
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(StorageError::InvalidFilter(
                "limit must be greater than zero".to_string(),
            ));
        }
        if let Some(names) = &self.names {
            if names.iter().any(|n| n.is_empty()) {
                return Err(StorageError::InvalidFilter(
                    "metric names must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Whether the filter narrows individual data points, not just metrics.
    pub(crate) fn filters_points(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some() || !self.labels.is_empty()
    }
}

/// Read access to the latest observed value of each metric.
///
/// The alert engine evaluates rules through this trait so it never holds a
/// reference to the store's internals.
pub trait MetricReader: Send + Sync {
    /// Latest value of `name`, or `None` if it was never observed (or reset).
    fn latest_value(&self, name: &str) -> Option<f64>;

    /// Latest values for several metrics, read in one pass. Unobserved names
    /// are absent from the map.
    fn latest_values(&self, names: &[&str]) -> HashMap<String, f64> {
        names
            .iter()
            .filter_map(|name| self.latest_value(name).map(|v| (name.to_string(), v)))
            .collect()
    }
}
