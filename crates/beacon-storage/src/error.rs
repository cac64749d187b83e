/// Errors raised by the in-memory metric store.
///
/// Recording errors (`EmptyName`, `NonFiniteValue`, `NegativeIncrement`) are
/// swallowed at the monitoring facade and surfaced as error events; the
/// remaining variants reach callers of query and reset operations.
///
/// # Examples
///
/// ```rust
/// use beacon_storage::error::StorageError;
///
/// let err = StorageError::MetricNotFound("cpu.usage".to_string());
/// assert!(err.to_string().contains("cpu.usage"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("Storage: metric name must not be empty")]
    EmptyName,

    #[error("Storage: non-finite value {value} for metric '{name}'")]
    NonFiniteValue { name: String, value: f64 },

    /// Counters only accumulate.
    #[error("Storage: negative increment {delta} for counter '{name}'")]
    NegativeIncrement { name: String, delta: f64 },

    #[error("Storage: metric '{0}' not found")]
    MetricNotFound(String),

    /// A query filter is malformed (e.g. `start_time` after `end_time`).
    #[error("Storage: invalid filter: {0}")]
    InvalidFilter(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
