//! Eviction Ordering
//!
//! Decides which entities go first when the cache has to shed whole entities,
//! either to honour `max_entities` on insert or when the memory manager asks it
//! to trim itself. Expired entries are always swept before this ordering applies.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::entry::EntityBucket;

/// Order in which live entities are evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionOrder {
    /// Evict the entity whose fields expire soonest (closest to natural expiry)
    #[default]
    SoonestExpiry,
    /// Evict the least recently read entity
    LeastRecentlyUsed,
    /// Evict the entity with the fewest cache hits, oldest first on ties
    LeastFrequentlyUsed,
}

impl EvictionOrder {
    /// Compare two buckets; `Ordering::Less` means `a` is evicted before `b`
    pub(crate) fn compare<V>(&self, a: &EntityBucket<V>, b: &EntityBucket<V>) -> Ordering {
        match self {
            EvictionOrder::SoonestExpiry => a.earliest_expiry().cmp(&b.earliest_expiry()),
            EvictionOrder::LeastRecentlyUsed => a.last_access().cmp(&b.last_access()),
            EvictionOrder::LeastFrequentlyUsed => a
                .hits()
                .cmp(&b.hits())
                .then_with(|| a.created_at().cmp(&b.created_at())),
        }
    }
}

impl fmt::Display for EvictionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionOrder::SoonestExpiry => write!(f, "soonest-expiry"),
            EvictionOrder::LeastRecentlyUsed => write!(f, "LRU"),
            EvictionOrder::LeastFrequentlyUsed => write!(f, "LFU"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::CacheEntry;
    use std::time::{Duration, Instant};

    fn bucket_with_ttl(ttl: Duration) -> EntityBucket<u8> {
        let mut bucket = EntityBucket::new();
        bucket.insert("field".into(), CacheEntry::new(0, ttl));
        bucket
    }

    #[test]
    fn test_soonest_expiry_order() {
        let short = bucket_with_ttl(Duration::from_secs(1));
        let long = bucket_with_ttl(Duration::from_secs(100));
        let order = EvictionOrder::SoonestExpiry;
        assert_eq!(order.compare(&short, &long), Ordering::Less);
        assert_eq!(order.compare(&long, &short), Ordering::Greater);
    }

    #[test]
    fn test_lfu_order() {
        let mut popular = bucket_with_ttl(Duration::from_secs(10));
        let cold = bucket_with_ttl(Duration::from_secs(10));
        let now = Instant::now();
        for _ in 0..5 {
            popular.record_hit(now);
        }
        let order = EvictionOrder::LeastFrequentlyUsed;
        assert_eq!(order.compare(&cold, &popular), Ordering::Less);
    }

    #[test]
    fn test_lru_order() {
        let mut recent = bucket_with_ttl(Duration::from_secs(10));
        let stale = bucket_with_ttl(Duration::from_secs(10));
        recent.record_hit(Instant::now() + Duration::from_millis(5));
        let order = EvictionOrder::LeastRecentlyUsed;
        assert_eq!(order.compare(&stale, &recent), Ordering::Less);
    }

    #[test]
    fn test_default_and_display() {
        assert_eq!(EvictionOrder::default(), EvictionOrder::SoonestExpiry);
        assert_eq!(EvictionOrder::LeastFrequentlyUsed.to_string(), "LFU");
        assert_eq!(EvictionOrder::LeastRecentlyUsed.to_string(), "LRU");
    }
}
