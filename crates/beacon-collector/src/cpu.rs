use crate::{Collector, Sample};
use anyhow::Result;
use sysinfo::System;

pub struct CpuCollector {
    system: System,
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn collect(&mut self) -> Result<Vec<Sample>> {
        self.system.refresh_cpu_all();
        let mut samples = vec![
            Sample::new("system.cpu.usage", self.system.global_cpu_usage() as f64),
            Sample::new("system.cpu.count", self.system.cpus().len() as f64),
        ];
        for (i, cpu) in self.system.cpus().iter().enumerate() {
            samples.push(
                Sample::new("system.cpu.core_usage", cpu.cpu_usage() as f64).with_label("core", i.to_string()),
            );
        }
        Ok(samples)
    }
}
