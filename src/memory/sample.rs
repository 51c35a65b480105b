//! Process Memory Samples
//!
//! A [`MemorySample`] is one snapshot of the host process. Samples come from a
//! [`MemoryProbe`]; [`SystemProbe`] reads the real process through `sysinfo`.
//!
//! Native processes have no separate managed heap, so the fields map as follows:
//!
//! | field        | source                                   |
//! |--------------|------------------------------------------|
//! | `heap_used`  | resident set size of the process         |
//! | `heap_total` | total physical memory of the host        |
//! | `external`   | virtual size not resident (mapped, swap) |
//! | `rss`        | resident set size of the process         |

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sysinfo::{get_current_pid, Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{Error, Result};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One snapshot of process memory, in bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    /// Memory in use by the process
    pub heap_used: u64,
    /// Memory available to the process
    pub heap_total: u64,
    /// Memory mapped by the process but not resident
    pub external: u64,
    /// Resident set size
    pub rss: u64,
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
}

impl MemorySample {
    /// Sample taken now
    pub fn new(heap_used: u64, heap_total: u64, external: u64, rss: u64) -> Self {
        Self {
            heap_used,
            heap_total,
            external,
            rss,
            timestamp: Utc::now(),
        }
    }

    /// Heap used as a percentage of heap total (0 when total is unknown)
    pub fn heap_used_percent(&self) -> f64 {
        if self.heap_total == 0 {
            0.0
        } else {
            self.heap_used as f64 / self.heap_total as f64 * 100.0
        }
    }

    /// Heap used in MiB
    pub fn heap_used_mb(&self) -> f64 {
        self.heap_used as f64 / BYTES_PER_MB
    }

    /// Resident set in MiB
    pub fn rss_mb(&self) -> f64 {
        self.rss as f64 / BYTES_PER_MB
    }
}

/// Source of memory samples
pub trait MemoryProbe: Send + Sync {
    /// Take a snapshot. Never fails; unknown figures are reported as zero.
    fn sample(&self) -> MemorySample;
}

/// Probe reading the current process through `sysinfo`
pub struct SystemProbe {
    pid: Pid,
    system: Mutex<System>,
}

impl SystemProbe {
    /// Resolve the current process
    pub fn new() -> Result<Self> {
        let pid = get_current_pid().map_err(|e| Error::ProcessLookup(e.to_string()))?;
        Ok(Self {
            pid,
            system: Mutex::new(System::new()),
        })
    }

    /// Process being sampled
    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl MemoryProbe for SystemProbe {
    fn sample(&self) -> MemorySample {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        let total = system.total_memory();
        match system.process(self.pid) {
            Some(process) => {
                let rss = process.memory();
                let external = process.virtual_memory().saturating_sub(rss);
                MemorySample::new(rss, total, external, rss)
            }
            None => MemorySample::new(0, total, 0, 0),
        }
    }
}

impl std::fmt::Debug for SystemProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProbe").field("pid", &self.pid).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
