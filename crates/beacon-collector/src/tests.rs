use crate::{default_collectors, Collector, CpuCollector, LoadCollector, MemoryCollector, ProcessCollector, Sample, SystemInfo};

fn find<'a>(samples: &'a [Sample], name: &str) -> Option<&'a Sample> {
    samples.iter().find(|s| s.name == name)
}

#[test]
fn cpu_collector_reports_global_and_per_core_usage() {
    let mut collector = CpuCollector::new();
    let samples = collector.collect().unwrap();

    let count = find(&samples, "system.cpu.count").unwrap().value as usize;
    assert!(count >= 1);
    let usage = find(&samples, "system.cpu.usage").unwrap().value;
    assert!((0.0..=100.0 * count as f64).contains(&usage));

    let cores: Vec<&Sample> = samples.iter().filter(|s| s.name == "system.cpu.core_usage").collect();
    assert_eq!(cores.len(), count);
    assert_eq!(cores[0].labels.get("core").map(String::as_str), Some("0"));
}

#[test]
fn memory_collector_percentages_are_bounded() {
    let mut collector = MemoryCollector::new();
    let samples = collector.collect().unwrap();

    assert!(find(&samples, "system.memory.total_bytes").unwrap().value > 0.0);
    let pct = find(&samples, "system.memory.used_percent").unwrap().value;
    assert!((0.0..=100.0).contains(&pct));
    let swap = find(&samples, "system.swap.used_percent").unwrap().value;
    assert!((0.0..=100.0).contains(&swap));
}

#[test]
fn load_collector_reports_uptime() {
    let samples = LoadCollector::new().collect().unwrap();
    assert_eq!(samples.len(), 4);
    assert!(find(&samples, "system.load_1").unwrap().value >= 0.0);
}

#[test]
fn process_collector_sees_current_process() {
    let mut collector = ProcessCollector::new();
    let samples = collector.collect().unwrap();
    assert!(find(&samples, "process.memory.rss_bytes").unwrap().value > 0.0);
    assert!(find(&samples, "process.uptime_seconds").unwrap().value >= 0.0);
}

#[test]
fn default_collectors_have_distinct_names() {
    let collectors = default_collectors();
    let mut names: Vec<&str> = collectors.iter().map(|c| c.name()).collect();
    names.sort();
    assert_eq!(names, vec!["cpu", "load", "memory", "process"]);
}

#[test]
fn system_info_describes_host() {
    let info = SystemInfo::collect();
    assert!(info.cpu_count >= 1);
    assert!(info.total_memory_bytes > 0);
    assert_eq!(info.pid, std::process::id());
    assert!(!info.arch.is_empty());
}

#[test]
fn sample_labels_accumulate() {
    let sample = Sample::new("x", 1.0).with_label("a", "1").with_label("b", "2");
    assert_eq!(sample.labels.len(), 2);
}
