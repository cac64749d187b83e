//! Types shared by every beacon crate: metric observations, health check
//! results, alert rules' actions and alert events, plus id generation.

pub mod id;
pub mod types;
