//! Memory Manager
//!
//! Owns the two background ticks around a [`MemoryMonitor`]:
//!
//! - monitoring tick (default 60s): record a sample, run the leak heuristic
//! - cleanup tick (default 5m): sweep and trim every registered collection
//!
//! Both ticks are started and stopped together under one lock.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::monitor::MemoryMonitor;
use super::report::MemoryReport;
use crate::error::Result;
use crate::timer::PeriodicTask;

struct Timers {
    monitor: PeriodicTask,
    cleanup: PeriodicTask,
}

/// Schedules memory monitoring and bounded eviction
pub struct MemoryManager {
    monitor: Arc<MemoryMonitor>,
    timers: Mutex<Option<Timers>>,
}

impl MemoryManager {
    /// Wrap a monitor. Nothing runs until [`start`](Self::start).
    pub fn new(monitor: Arc<MemoryMonitor>) -> Self {
        Self {
            monitor,
            timers: Mutex::new(None),
        }
    }

    /// Start both ticks with the configured intervals
    pub fn start(&self) -> Result<()> {
        let config = self.monitor.config();
        self.start_with(config.monitor_interval, config.cleanup_interval)
    }

    /// Start both ticks with explicit intervals.
    ///
    /// Calling this while already running logs a warning and changes nothing.
    pub fn start_with(&self, monitor_interval: Duration, cleanup_interval: Duration) -> Result<()> {
        let mut timers = self.timers.lock();
        if timers.is_some() {
            warn!("Memory manager already running, ignoring start");
            return Ok(());
        }

        let monitor = Arc::clone(&self.monitor);
        let monitor_task = PeriodicTask::spawn("memory-monitor", monitor_interval, move || {
            let sample = monitor.track_memory_usage();
            debug!(
                "Memory sample: {:.1} MiB used ({:.1}%), rss {:.1} MiB",
                sample.heap_used_mb(),
                sample.heap_used_percent(),
                sample.rss_mb()
            );
            if let Some(trend) = monitor.trend().filter(|t| t.leak_suspected) {
                warn!(
                    "Possible memory leak: mean usage grew {:.1}% ({:.0} -> {:.0} bytes)",
                    (trend.growth_ratio - 1.0) * 100.0,
                    trend.older_mean,
                    trend.recent_mean
                );
            }
            ControlFlow::Continue(())
        })?;

        let monitor = Arc::clone(&self.monitor);
        let cleanup_task = PeriodicTask::spawn("memory-cleanup", cleanup_interval, move || {
            let outcome = monitor.clear_expired_caches();
            if !outcome.is_empty() {
                info!(
                    "Memory cleanup cleared {} entries (~{} bytes)",
                    outcome.entries_cleared, outcome.bytes_freed
                );
            }
            ControlFlow::Continue(())
        })?;

        *timers = Some(Timers {
            monitor: monitor_task,
            cleanup: cleanup_task,
        });
        info!(
            "Memory manager started (monitor every {:?}, cleanup every {:?})",
            monitor_interval, cleanup_interval
        );
        Ok(())
    }

    /// Stop both ticks. A no-op when not running.
    pub fn stop(&self) {
        let Some(timers) = self.timers.lock().take() else {
            return;
        };
        timers.monitor.stop();
        timers.cleanup.stop();
        info!("Memory manager stopped");
    }

    /// Check if the ticks are scheduled
    pub fn is_running(&self) -> bool {
        self.timers.lock().is_some()
    }

    /// Underlying monitor
    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    /// Build a report from a fresh sample
    pub fn memory_report(&self) -> MemoryReport {
        self.monitor.memory_report()
    }

    /// Run the leak heuristic over the recorded history
    pub fn detect_memory_leak(&self) -> bool {
        self.monitor.detect_memory_leak()
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("monitor", &self.monitor)
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
