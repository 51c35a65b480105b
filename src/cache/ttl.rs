//! TTL Keyed Cache
//!
//! Two-level cache keyed by entity (a guild) and field (`"language"`, `"setup"`,
//! ...). Values expire after a TTL and are removed lazily on read, by a periodic
//! sweep, or by explicit invalidation.
//!
//! # Consistency
//!
//! The cache is never the source of truth. Every write to the authoritative store
//! must be followed by [`TtlCache::invalidate`] for the affected key; the TTL only
//! bounds how long a missed invalidation can serve stale data. A miss always means
//! "go read the store", which is the caller's job.
//!
//! # Design
//!
//! - One `parking_lot::Mutex` guards the whole namespace; reads take it too since
//!   lazy expiry mutates
//! - An entity whose last field is removed is dropped from the outer map at once
//! - The entity count is capped by `max_entities`: inserting a new entity at the
//!   cap sweeps expired entries first and then evicts by [`EvictionOrder`]

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entry::{CacheEntry, EntityBucket};
use super::policy::EvictionOrder;
use super::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_ENTITIES, DEFAULT_TTL, ENTRY_SIZE_ESTIMATE};
use crate::config::deserialize_duration;
use crate::error::{Error, Result};
use crate::memory::{BoundedCollection, EvictionOutcome};
use crate::timer::PeriodicTask;

/// TTL cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied by [`TtlCache::set`]
    #[serde(deserialize_with = "deserialize_duration")]
    pub default_ttl: Duration,
    /// Maximum number of distinct entities
    pub max_entities: usize,
    /// Interval of the background sweep
    #[serde(deserialize_with = "deserialize_duration")]
    pub cleanup_interval: Duration,
    /// Which live entities go first when the cap is hit
    pub eviction_order: EvictionOrder,
    /// Approximate bytes per field entry, for reporting only
    pub entry_size_estimate: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_entities: DEFAULT_MAX_ENTITIES,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            eviction_order: EvictionOrder::default(),
            entry_size_estimate: ENTRY_SIZE_ESTIMATE,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(Error::invalid_config("cache.default_ttl", "must be greater than zero"));
        }
        if self.max_entities == 0 {
            return Err(Error::invalid_config("cache.max_entities", "must be at least 1"));
        }
        if self.cleanup_interval.is_zero() {
            return Err(Error::invalid_config(
                "cache.cleanup_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of entities tracked
    pub entities: usize,
    /// Number of field entries across all entities
    pub entries: usize,
    /// Approximate footprint in bytes
    pub estimated_bytes: u64,
    /// Hit count
    pub hits: u64,
    /// Miss count (absent or expired)
    pub misses: u64,
    /// Entities evicted to honour the entity cap
    pub evictions: u64,
}

impl CacheStats {
    /// Hit ratio (0.0 - 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type Namespace<V> = HashMap<String, EntityBucket<V>>;

/// Per-entity, per-field TTL cache
pub struct TtlCache<V> {
    config: CacheConfig,
    namespace: Mutex<Namespace<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V> TtlCache<V> {
    /// Create a cache with the default configuration
    pub fn new() -> Self {
        Self::build(CacheConfig::default())
    }

    /// Create a cache with a custom configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        Self {
            config,
            namespace: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert or overwrite a value with the default TTL
    pub fn set(&self, entity_id: impl Into<String>, field: impl Into<String>, value: V) {
        let entry = CacheEntry::new(value, self.config.default_ttl);
        self.insert(entity_id.into(), field.into(), entry);
    }

    /// Insert or overwrite a value with an explicit TTL
    pub fn set_with_ttl(
        &self,
        entity_id: impl Into<String>,
        field: impl Into<String>,
        value: V,
        ttl: Duration,
    ) -> Result<()> {
        let entity_id = entity_id.into();
        let field = field.into();
        if ttl.is_zero() {
            return Err(Error::ZeroTtl { entity_id, field });
        }
        self.insert(entity_id, field, CacheEntry::new(value, ttl));
        Ok(())
    }

    fn insert(&self, entity_id: String, field: String, entry: CacheEntry<V>) {
        let mut namespace = self.namespace.lock();

        if namespace.len() >= self.config.max_entities {
            let swept = sweep(&mut *namespace, Instant::now());
            debug!(
                "Cache at capacity ({} entities), swept {} expired entries",
                namespace.len(),
                swept
            );

            if !namespace.contains_key(&entity_id) && namespace.len() >= self.config.max_entities
            {
                let excess = namespace.len() + 1 - self.config.max_entities;
                self.evict(&mut *namespace, excess);
            }
        }

        let bucket = namespace.entry(entity_id).or_insert_with(EntityBucket::new);
        bucket.insert(field, entry);
        bucket.touch(Instant::now());
    }

    /// Remove one field, or every field of the entity when `field` is `None`.
    ///
    /// Returns how many entries were removed; unknown keys are a no-op.
    pub fn invalidate(&self, entity_id: &str, field: Option<&str>) -> usize {
        let mut namespace = self.namespace.lock();

        match field {
            None => namespace.remove(entity_id).map_or(0, |bucket| bucket.len()),
            Some(field) => {
                let Some(bucket) = namespace.get_mut(entity_id) else {
                    return 0;
                };
                let removed = usize::from(bucket.remove(field).is_some());
                if bucket.is_empty() {
                    namespace.remove(entity_id);
                }
                removed
            }
        }
    }

    /// Sweep every expired entry, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let mut namespace = self.namespace.lock();
        let removed = sweep(&mut *namespace, Instant::now());
        if removed > 0 {
            debug!("Cache cleanup removed {} expired entries", removed);
        }
        removed
    }

    /// Drop everything
    pub fn clear(&self) {
        self.namespace.lock().clear();
    }

    /// Number of entities tracked
    pub fn len(&self) -> usize {
        self.namespace.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.namespace.lock().is_empty()
    }

    /// Number of field entries across all entities
    pub fn entry_count(&self) -> usize {
        self.namespace.lock().values().map(EntityBucket::len).sum()
    }

    /// Get a statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let (entities, entries) = {
            let namespace = self.namespace.lock();
            let entries: usize = namespace.values().map(EntityBucket::len).sum();
            (namespace.len(), entries)
        };

        CacheStats {
            entities,
            entries,
            estimated_bytes: entries as u64 * self.config.entry_size_estimate,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Evict up to `count` live entities in eviction order, returning the number
    /// of field entries dropped with them
    fn evict(&self, namespace: &mut Namespace<V>, count: usize) -> usize {
        let order = self.config.eviction_order;
        let mut ranked: Vec<(&String, &EntityBucket<V>)> = namespace.iter().collect();
        ranked.sort_by(|a, b| order.compare(a.1, b.1));
        let victims: Vec<String> = ranked
            .into_iter()
            .take(count)
            .map(|(key, _)| key.clone())
            .collect();

        let mut entries = 0;
        for key in &victims {
            if let Some(bucket) = namespace.remove(key) {
                entries += bucket.len();
            }
        }

        self.evictions
            .fetch_add(victims.len() as u64, Ordering::Relaxed);
        debug!(
            "Evicted {} cache entities ({} entries) by {} order",
            victims.len(),
            entries,
            order
        );
        entries
    }
}

impl<V: Clone> TtlCache<V> {
    /// Get a value unless it is absent or expired.
    ///
    /// An expired entry is removed before `None` is returned.
    pub fn get(&self, entity_id: &str, field: &str) -> Option<V> {
        let mut namespace = self.namespace.lock();
        let now = Instant::now();

        let Some(bucket) = namespace.get_mut(entity_id) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let expired = match bucket.get(field) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            bucket.remove(field);
            if bucket.is_empty() {
                namespace.remove(entity_id);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        bucket.record_hit(now);
        self.hits.fetch_add(1, Ordering::Relaxed);
        bucket.get(field).map(|entry| entry.value().clone())
    }
}

impl<V: Send + 'static> TtlCache<V> {
    /// Spawn the periodic cleanup sweep on the current Tokio runtime.
    ///
    /// The task holds a weak reference and ends once the cache is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>) -> Result<PeriodicTask> {
        let cache: Weak<Self> = Arc::downgrade(self);
        PeriodicTask::spawn("cache-cleanup", self.config.cleanup_interval, move || {
            match cache.upgrade() {
                Some(cache) => {
                    cache.cleanup();
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }
        })
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.config)
            .field("entities", &self.len())
            .finish()
    }
}

impl<V: Send> BoundedCollection for TtlCache<V> {
    fn len(&self) -> usize {
        TtlCache::len(self)
    }

    fn entry_size_estimate(&self) -> u64 {
        self.config.entry_size_estimate
    }

    fn entry_count(&self) -> usize {
        TtlCache::entry_count(self)
    }

    fn sweep_expired(&self) -> EvictionOutcome {
        let cleared = self.cleanup();
        EvictionOutcome::new(cleared, self.config.entry_size_estimate)
    }

    fn trim_to(&self, max_entries: usize) -> EvictionOutcome {
        let mut namespace = self.namespace.lock();
        if namespace.len() <= max_entries {
            return EvictionOutcome::default();
        }
        let excess = namespace.len() - max_entries;
        let cleared = self.evict(&mut *namespace, excess);
        EvictionOutcome::new(cleared, self.config.entry_size_estimate)
    }
}

/// Remove expired fields and emptied entities, returning the entries removed
fn sweep<V>(namespace: &mut Namespace<V>, now: Instant) -> usize {
    let mut removed = 0;
    namespace.retain(|_, bucket| {
        removed += bucket.purge_expired(now);
        !bucket.is_empty()
    });
    removed
}

// =============================================================================
// Tests
// =============================================================================
