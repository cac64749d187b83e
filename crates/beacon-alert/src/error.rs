/// Errors returned by alert rule CRUD operations.
///
/// Evaluation itself never fails; only operator-driven calls on the rule set
/// produce these.
///
/// # Examples
///
/// ```rust
/// use beacon_alert::AlertError;
///
/// let err = AlertError::RuleNotFound("cpu-high".to_string());
/// assert!(err.to_string().contains("cpu-high"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("Alert: rule '{0}' already exists")]
    DuplicateRule(String),

    #[error("Alert: rule '{0}' not found")]
    RuleNotFound(String),

    #[error("Alert: invalid rule: {0}")]
    InvalidRule(String),

    #[error("Alert: rule '{0}' has no active alert")]
    NoActiveAlert(String),
}

/// Convenience `Result` alias for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
