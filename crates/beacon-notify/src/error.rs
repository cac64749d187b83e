/// Errors raised by the built-in action channels.
///
/// Channels return `anyhow::Result` at the trait seam; these variants are
/// what they wrap, so callers can `downcast_ref` when they need detail.
///
/// # Examples
///
/// ```rust
/// use beacon_notify::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing smtp host".to_string());
/// assert!(err.to_string().contains("smtp host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// The action handed to a channel belongs to another channel kind.
    #[error("Notify: channel '{channel}' cannot handle '{action}' actions")]
    ActionMismatch { channel: String, action: String },

    /// An HTTP request to a webhook endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook endpoint answered with a non-success status.
    #[error("Notify: webhook {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// SMTP transport error when sending email.
    #[error("Notify: SMTP error: {0}")]
    Smtp(String),

    /// A sender or recipient address could not be parsed.
    #[error("Notify: invalid email address '{0}'")]
    InvalidAddress(String),

    /// The in-process notification receiver has been dropped.
    #[error("Notify: notification sink closed")]
    SinkClosed,
}

/// Convenience `Result` alias for notify operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
