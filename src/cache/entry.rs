//! Cache Entry Types
//!
//! A [`CacheEntry`] holds one field value for one entity. Entries for the same
//! entity live together in an [`EntityBucket`], which also carries the access
//! statistics used when the cache has to evict whole entities.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single cached field value with its expiry deadline
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create an entry expiring `ttl` from now
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Borrow the cached value
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Expiry deadline
    #[inline]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Check if the entry has expired at `now`
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Check if the entry has expired
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time left before expiry (zero once expired)
    pub fn time_left(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// All cached fields for one entity (e.g. one guild)
#[derive(Debug)]
pub(crate) struct EntityBucket<V> {
    fields: HashMap<String, CacheEntry<V>>,
    created_at: Instant,
    last_access: Instant,
    hits: u64,
}

impl<V> EntityBucket<V> {
    pub(crate) fn new() -> Self {
        let now = Instant::now();
        Self {
            fields: HashMap::new(),
            created_at: now,
            last_access: now,
            hits: 0,
        }
    }

    pub(crate) fn get(&self, field: &str) -> Option<&CacheEntry<V>> {
        self.fields.get(field)
    }

    pub(crate) fn insert(&mut self, field: String, entry: CacheEntry<V>) {
        self.fields.insert(field, entry);
    }

    pub(crate) fn remove(&mut self, field: &str) -> Option<CacheEntry<V>> {
        self.fields.remove(field)
    }

    /// Drop expired fields, returning how many were removed
    pub(crate) fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.fields.len();
        self.fields.retain(|_, entry| !entry.is_expired_at(now));
        before - self.fields.len()
    }

    pub(crate) fn record_hit(&mut self, now: Instant) {
        self.hits += 1;
        self.touch(now);
    }

    /// Mark the bucket as used without counting a hit (writes)
    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_access = self.last_access.max(now);
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    pub(crate) fn last_access(&self) -> Instant {
        self.last_access
    }

    /// Earliest expiry among the bucket's fields
    pub(crate) fn earliest_expiry(&self) -> Option<Instant> {
        self.fields.values().map(CacheEntry::expires_at).min()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_not_expired_within_ttl() {
        let entry = CacheEntry::new("en-US", Duration::from_secs(60));
        assert_eq!(*entry.value(), "en-US");
        assert!(!entry.is_expired());
        assert!(entry.time_left() > Duration::from_secs(59));
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = CacheEntry::new(1u8, Duration::from_millis(10));
        let deadline = entry.expires_at();
        assert!(!entry.is_expired_at(deadline - Duration::from_millis(1)));
        assert!(entry.is_expired_at(deadline));
    }

    #[test]
    fn test_entry_time_left_saturates() {
        let entry = CacheEntry::new((), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(entry.is_expired());
        assert_eq!(entry.time_left(), Duration::ZERO);
    }

    #[test]
    fn test_bucket_purge_expired() {
        let mut bucket = EntityBucket::new();
        bucket.insert("language".into(), CacheEntry::new(1, Duration::from_millis(1)));
        bucket.insert("setup".into(), CacheEntry::new(2, Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(bucket.purge_expired(Instant::now()), 1);
        assert_eq!(bucket.len(), 1);
        assert!(bucket.get("language").is_none());
        assert_eq!(*bucket.get("setup").unwrap().value(), 2);
    }

    #[test]
    fn test_bucket_hit_tracking() {
        let mut bucket: EntityBucket<u8> = EntityBucket::new();
        assert_eq!(bucket.hits(), 0);
        let now = Instant::now();
        bucket.record_hit(now);
        bucket.record_hit(now);
        assert_eq!(bucket.hits(), 2);
        assert_eq!(bucket.last_access(), now);
        assert!(bucket.created_at() <= now);
    }

    #[test]
    fn test_bucket_touch_moves_last_access_only() {
        let mut bucket: EntityBucket<u8> = EntityBucket::new();
        let later = Instant::now() + Duration::from_millis(10);
        bucket.touch(later);
        assert_eq!(bucket.last_access(), later);
        assert_eq!(bucket.hits(), 0);

        bucket.touch(later - Duration::from_millis(5));
        assert_eq!(bucket.last_access(), later);
    }

    #[test]
    fn test_bucket_earliest_expiry() {
        let mut bucket = EntityBucket::new();
        assert!(bucket.earliest_expiry().is_none());
        let short = CacheEntry::new(1, Duration::from_secs(5));
        let short_deadline = short.expires_at();
        bucket.insert("a".into(), CacheEntry::new(0, Duration::from_secs(50)));
        bucket.insert("b".into(), short);
        assert_eq!(bucket.earliest_expiry(), Some(short_deadline));
    }
}
