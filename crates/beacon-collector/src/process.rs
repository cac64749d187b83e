use crate::{Collector, Sample};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Resource usage of the current process.
pub struct ProcessCollector {
    system: System,
    pid: Pid,
    started_at: DateTime<Utc>,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    pub fn new() -> Self {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        Self {
            system,
            pid,
            started_at: Utc::now(),
        }
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &str {
        "process"
    }

    fn collect(&mut self) -> Result<Vec<Sample>> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| anyhow!("process {} not visible", self.pid))?;

        let uptime = (Utc::now() - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        Ok(vec![
            Sample::new("process.memory.rss_bytes", process.memory() as f64),
            Sample::new("process.memory.virtual_bytes", process.virtual_memory() as f64),
            Sample::new("process.cpu.usage", process.cpu_usage() as f64),
            Sample::new("process.uptime_seconds", uptime),
        ])
    }
}
