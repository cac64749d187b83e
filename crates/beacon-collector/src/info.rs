use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::System;

/// Static and slowly changing facts about the host.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub arch: String,
    pub cpu_count: usize,
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
    pub uptime_secs: u64,
    pub load_average: [f64; 3],
    pub pid: u32,
    pub collected_at: DateTime<Utc>,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.refresh_memory();
        let load = System::load_average();
        let unknown = || "unknown".to_string();

        Self {
            hostname: System::host_name().unwrap_or_else(unknown),
            os_name: System::name().unwrap_or_else(unknown),
            os_version: System::os_version().unwrap_or_else(unknown),
            kernel_version: System::kernel_version().unwrap_or_else(unknown),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: system.cpus().len(),
            total_memory_bytes: system.total_memory(),
            used_memory_bytes: system.used_memory(),
            uptime_secs: System::uptime(),
            load_average: [load.one, load.five, load.fifteen],
            pid: std::process::id(),
            collected_at: Utc::now(),
        }
    }
}
