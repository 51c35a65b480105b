//! Guild Configuration Cache
//!
//! Per-entity, per-field TTL cache used to avoid a database read on every command
//! invocation for slow-changing guild settings.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        TtlCache<V>                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Mutex<HashMap<entity, EntityBucket>>                            │
//! │     "g1" ─▶ { "language": Entry, "setup": Entry }                │
//! │     "g2" ─▶ { "language": Entry }                                │
//! │                              │                                   │
//! │     lazy expiry on get ──────┼────── periodic sweep (10m)        │
//! │                              │                                   │
//! │              entity cap: sweep, then evict by order              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod entry;
mod policy;
mod ttl;

pub use entry::CacheEntry;
pub use policy::EvictionOrder;
pub use ttl::{CacheConfig, CacheStats, TtlCache};

use std::time::Duration;

/// Default entry TTL (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default background sweep interval (10 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default cap on distinct entities
pub const DEFAULT_MAX_ENTITIES: usize = 10_000;

/// Approximate bytes per cached field entry (key strings, value, map overhead)
pub const ENTRY_SIZE_ESTIMATE: u64 = 256;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        assert_eq!(DEFAULT_TTL, Duration::from_secs(300));
        assert_eq!(DEFAULT_CLEANUP_INTERVAL, Duration::from_secs(600));
        assert!(DEFAULT_CLEANUP_INTERVAL > DEFAULT_TTL);
    }
}
