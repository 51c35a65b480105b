//! Process Memory Monitoring
//!
//! Samples process memory on a fixed cadence, keeps a bounded history, flags
//! sustained growth, and keeps registered collections under their limits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        MemoryManager                             │
//! │      monitor tick (60s)               cleanup tick (5m)          │
//! └────────────┬──────────────────────────────────┬──────────────────┘
//!              ▼                                  ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        MemoryMonitor                             │
//! ├───────────────────────┬──────────────────────────────────────────┤
//! │  MemoryProbe          │  CollectionRegistry                      │
//! │    └─▶ SampleHistory  │    "guild-cache" ─▶ TtlCache             │
//! │         (ring, 100)   │    "cooldowns"   ─▶ CooldownTracker      │
//! │    leak: last 20 vs   │    "commands"    ─▶ FnCollection         │
//! │          previous 20  │  sweep_expired() then trim_to(max)       │
//! └───────────────────────┴──────────────────────────────────────────┘
//! ```

mod history;
mod manager;
mod monitor;
mod registry;
mod report;
mod sample;

pub use history::{SampleHistory, TrendAnalysis};
pub use manager::MemoryManager;
pub use monitor::{MemoryConfig, MemoryMonitor};
pub use registry::{BoundedCollection, CollectionRegistry, CollectionStat, EvictionOutcome, FnCollection};
pub use report::{HealthStatus, MemoryReport};
pub use sample::{MemoryProbe, MemorySample, SystemProbe};

use std::time::Duration;

/// Default sampling interval (60 seconds)
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Default bounded eviction interval (5 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default number of samples kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default samples per leak comparison window
pub const DEFAULT_LEAK_WINDOW: usize = 20;

/// Default relative growth that flags a leak
pub const DEFAULT_LEAK_GROWTH_THRESHOLD: f64 = 0.20;
