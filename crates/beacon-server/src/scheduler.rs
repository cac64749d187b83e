use crate::error::{MonitorError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A named periodic task.
#[derive(Clone)]
pub struct Job {
    pub name: &'static str,
    pub period: Duration,
    pub tick: TickFn,
}

impl Job {
    pub fn new<F>(name: &'static str, period: Duration, tick: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self {
            name,
            period,
            tick: Arc::new(tick),
        }
    }
}

/// Owns the periodic loops. Each job runs on its own task; the first tick
/// fires immediately.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one loop per job. Returns `Ok(false)` without spawning when
    /// loops are already running.
    pub fn start(&self, jobs: Vec<Job>) -> Result<bool> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        let mut tasks = self.tasks.lock();
        if tasks.iter().any(|(_, h)| !h.is_finished()) {
            tracing::debug!("Scheduler already running");
            return Ok(false);
        }
        tasks.clear();

        for job in jobs {
            tracing::info!(job = job.name, period_secs = job.period.as_secs(), "Starting scheduled job");
            let name = job.name;
            tasks.push((name, runtime.spawn(run_loop(job))));
        }
        Ok(true)
    }

    /// Abort every loop. Safe to call repeatedly; returns how many loops
    /// were stopped by this call.
    pub fn stop(&self) -> usize {
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        let mut stopped = 0;
        for (name, handle) in tasks {
            if !handle.is_finished() {
                stopped += 1;
            }
            handle.abort();
            tracing::debug!(job = name, "Scheduled job stopped");
        }
        if stopped > 0 {
            tracing::info!(stopped, "Scheduler stopped");
        }
        stopped
    }

    /// Names of loops that are still alive.
    pub fn active_tasks(&self) -> Vec<&'static str> {
        self.tasks
            .lock()
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_running(&self) -> bool {
        !self.active_tasks().is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.get_mut().drain(..) {
            handle.abort();
        }
    }
}

async fn run_loop(job: Job) {
    let mut ticker = time::interval(job.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match AssertUnwindSafe(async { (job.tick)().await }).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(job = job.name, error = %e, "Scheduled job tick failed"),
            Err(_) => tracing::error!(job = job.name, "Scheduled job tick panicked"),
        }
    }
}
