use crate::{Collector, Sample};
use anyhow::Result;
use sysinfo::System;

pub struct MemoryCollector {
    system: System,
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn collect(&mut self) -> Result<Vec<Sample>> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();

        Ok(vec![
            Sample::new("system.memory.total_bytes", total as f64),
            Sample::new("system.memory.used_bytes", used as f64),
            Sample::new("system.memory.available_bytes", self.system.available_memory() as f64),
            Sample::new("system.memory.used_percent", percent(used, total)),
            Sample::new("system.swap.used_bytes", swap_used as f64),
            Sample::new("system.swap.used_percent", percent(swap_used, swap_total)),
        ])
    }
}
