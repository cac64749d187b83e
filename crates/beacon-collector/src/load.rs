use crate::{Collector, Sample};
use anyhow::Result;
use sysinfo::System;

/// Load averages and uptime. Load averages read as zero on Windows.
#[derive(Default)]
pub struct LoadCollector;

impl LoadCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Collector for LoadCollector {
    fn name(&self) -> &str {
        "load"
    }

    fn collect(&mut self) -> Result<Vec<Sample>> {
        let load = System::load_average();
        Ok(vec![
            Sample::new("system.load_1", load.one),
            Sample::new("system.load_5", load.five),
            Sample::new("system.load_15", load.fifteen),
            Sample::new("system.uptime_seconds", System::uptime() as f64),
        ])
    }
}
