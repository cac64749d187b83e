//! Alert action dispatch with pluggable channel support.
//!
//! Each [`AlertAction`] attached to a rule is delivered through the
//! [`ActionChannel`] registered for its kind. Built-in channels cover
//! logging, webhooks (JSON POST), email (SMTP) and an in-process
//! notification sink.

pub mod channels;
pub mod error;
pub mod manager;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::{AlertAction, AlertEvent};
use serde::{Deserialize, Serialize};

pub use error::NotifyError;
pub use manager::ActionDispatcher;

/// Whether a notice announces a new alert or the end of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPhase {
    Triggered,
    Resolved,
}

impl std::fmt::Display for AlertPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertPhase::Triggered => write!(f, "triggered"),
            AlertPhase::Resolved => write!(f, "resolved"),
        }
    }
}

/// An alert event together with the transition that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotice {
    pub event: AlertEvent,
    pub phase: AlertPhase,
}

impl AlertNotice {
    pub fn triggered(event: AlertEvent) -> Self {
        Self {
            event,
            phase: AlertPhase::Triggered,
        }
    }

    pub fn resolved(event: AlertEvent) -> Self {
        Self {
            event,
            phase: AlertPhase::Resolved,
        }
    }

    /// One-line summary used by the log channel and email subjects.
    pub fn headline(&self) -> String {
        match self.phase {
            AlertPhase::Triggered => format!(
                "[{}] {}: {}",
                self.event.severity, self.event.rule_name, self.event.message
            ),
            AlertPhase::Resolved => format!(
                "[{}][RESOLVED] {}: {} back to {:.2}",
                self.event.severity, self.event.rule_name, self.event.metric_name, self.event.value
            ),
        }
    }
}

/// A delivery channel for one kind of [`AlertAction`].
///
/// Implementations are registered in the [`ActionDispatcher`] under
/// [`kind`](ActionChannel::kind), which must match [`AlertAction::kind`].
#[async_trait]
pub trait ActionChannel: Send + Sync {
    /// The action kind this channel handles (e.g. `"webhook"`).
    fn kind(&self) -> &str;

    /// Delivers the notice according to `action`.
    ///
    /// # Errors
    ///
    /// Returns an error if the action is of another kind or delivery fails
    /// after retries (if applicable).
    async fn send(&self, action: &AlertAction, notice: &AlertNotice) -> Result<()>;
}
