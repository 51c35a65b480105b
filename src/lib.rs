//! Guild Lifecycle - Resource Lifecycle Layer for a Guild Music Bot
//!
//! Keeps per-guild state bounded and short-lived in a long-running bot process:
//! a TTL cache for slow-changing guild settings, a multi-scope command cooldown
//! tracker, and a process memory monitor that flags sustained growth and trims
//! registered collections.
//!
//! # Architecture
//!
//! ```text
//!   command handlers ──▶ TtlCache<V> ◀──┐
//!          │                            │ register / trim
//!          └─────────▶ CooldownTracker ◀┤
//!                                       │
//!                 MemoryManager ──▶ MemoryMonitor ──▶ MemoryProbe
//! ```
//!
//! Every component guards its state with a single mutex and is shared as an
//! `Arc`. Background sweeps are [`timer::PeriodicTask`]s on the Tokio runtime.
//!
//! # Modules
//!
//! - [`cache`] - Per-entity, per-field TTL cache
//! - [`cooldown`] - Multi-scope command cooldowns
//! - [`memory`] - Process memory sampling, leak heuristic and bounded eviction
//! - [`lifecycle`] - Startup wiring of all components
//! - [`config`] - Aggregate configuration and duration parsing
//! - [`telemetry`] - Logging setup
//! - [`timer`] - Cancellable periodic tasks
//! - [`error`] - Error types

pub mod cache;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod telemetry;
pub mod timer;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheStats, EvictionOrder, TtlCache};
pub use config::{parse_duration, LifecycleConfig};
pub use cooldown::{CooldownConfig, CooldownContext, CooldownStatus, CooldownTracker, Scope};
pub use error::{Error, Result};
pub use lifecycle::Lifecycle;
pub use memory::{
    BoundedCollection, EvictionOutcome, HealthStatus, MemoryConfig, MemoryManager, MemoryMonitor,
    MemoryReport, MemorySample,
};
pub use telemetry::{init_logging, LogConfig};
