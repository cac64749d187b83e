//! Host and process metric collection.
//!
//! Each [`Collector`] gathers one category of measurements (CPU, memory,
//! load, this process) and returns them as [`Sample`]s for the caller to
//! record as gauges. [`SystemInfo`] is a one-shot description of the host.

pub mod cpu;
pub mod info;
pub mod load;
pub mod memory;
pub mod process;

#[cfg(test)]
mod tests;

use anyhow::Result;
use beacon_common::types::Labels;

pub use cpu::CpuCollector;
pub use info::SystemInfo;
pub use load::LoadCollector;
pub use memory::MemoryCollector;
pub use process::ProcessCollector;

/// One named measurement produced by a collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    pub labels: Labels,
}

impl Sample {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            labels: Labels::new(),
        }
    }

    pub fn with_label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }
}

/// A source of periodic measurements.
///
/// Collectors keep their own `sysinfo` state between calls, since CPU usage
/// is derived from the difference between two refreshes.
pub trait Collector: Send + Sync {
    /// Returns the collector name (e.g., `"cpu"`), used for logging.
    fn name(&self) -> &str;

    /// Collects current values.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<Vec<Sample>>;
}

/// The standard set of host and process collectors.
pub fn default_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(CpuCollector::new()),
        Box::new(MemoryCollector::new()),
        Box::new(LoadCollector::new()),
        Box::new(ProcessCollector::new()),
    ]
}
