//! Alert rule evaluation against the latest metric values.
//!
//! The [`engine::AlertEngine`] owns the rule set and the active-alert map.
//! Each call to [`engine::AlertEngine::evaluate`] is one scheduler tick: every
//! enabled rule moves between *idle* and *triggered* and the resulting
//! [`engine::AlertTransition`]s are returned for dispatch. At most one
//! unresolved alert exists per rule.

pub mod engine;
pub mod error;
pub mod rule;


pub use engine::{AlertEngine, AlertPolicy, AlertTransition};
pub use error::AlertError;
pub use rule::{AlertCondition, AlertRule, CompareOp, MAX_DURATION_SECS};
