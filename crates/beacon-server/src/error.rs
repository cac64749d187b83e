use beacon_alert::AlertError;
use beacon_storage::StorageError;

/// Errors surfaced by [`MonitoringService`](crate::MonitoringService)
/// query and CRUD operations. Recording and evaluation never return these;
/// their failures are logged and published as error events instead.
///
/// # Examples
///
/// ```rust
/// use beacon_server::MonitorError;
///
/// let err = MonitorError::InvalidConfig("max_data_points must be positive".to_string());
/// assert!(err.to_string().contains("max_data_points"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error("Monitor: invalid configuration: {0}")]
    InvalidConfig(String),

    /// Scheduling requires a running tokio runtime.
    #[error("Monitor: no async runtime available to start the scheduler")]
    NoRuntime,
}

/// Convenience `Result` alias for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
