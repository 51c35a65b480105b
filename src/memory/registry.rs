//! Registered Collections
//!
//! The memory monitor never touches another component's storage. Components
//! expose themselves through [`BoundedCollection`]: size accessors, a byte
//! estimate, and trim requests that the component carries out under its own lock.

use std::ops::AddAssign;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// Bytes and entries released by a sweep or trim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionOutcome {
    /// Entries removed
    pub entries_cleared: usize,
    /// Approximate bytes released
    pub bytes_freed: u64,
}

impl EvictionOutcome {
    /// Outcome for `entries` removed at `entry_size` bytes each
    pub fn new(entries: usize, entry_size: u64) -> Self {
        Self {
            entries_cleared: entries,
            bytes_freed: entries as u64 * entry_size,
        }
    }

    /// Check if nothing was removed
    pub fn is_empty(&self) -> bool {
        self.entries_cleared == 0
    }
}

impl AddAssign for EvictionOutcome {
    fn add_assign(&mut self, other: Self) {
        self.entries_cleared += other.entries_cleared;
        self.bytes_freed += other.bytes_freed;
    }
}

/// A size-observable collection the memory monitor can report on and trim
///
/// `len` is counted in whatever unit the collection is bounded by (entities for
/// the guild cache) and is what `max_entries` and `trim_to` refer to.
/// `entry_count` is the number of stored entries, the unit reports add up.
pub trait BoundedCollection: Send + Sync {
    /// Current cardinality in the bounded unit
    fn len(&self) -> usize;

    /// Check if the collection is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored entries; equal to `len` unless entries are grouped
    fn entry_count(&self) -> usize {
        self.len()
    }

    /// Approximate bytes per entry
    fn entry_size_estimate(&self) -> u64;

    /// Approximate total footprint
    fn estimated_bytes(&self) -> u64 {
        self.entry_count() as u64 * self.entry_size_estimate()
    }

    /// Remove expired entries, if the collection has a notion of expiry
    fn sweep_expired(&self) -> EvictionOutcome {
        EvictionOutcome::default()
    }

    /// Shrink to at most `max_entries` by dropping lowest-priority entries
    fn trim_to(&self, max_entries: usize) -> EvictionOutcome;
}

/// Count-only collection backed by a closure, for tables owned elsewhere
/// (command and alias tables). It can be reported on but never trimmed.
pub struct FnCollection<F> {
    len_fn: F,
    entry_size_estimate: u64,
}

impl<F> FnCollection<F>
where
    F: Fn() -> usize + Send + Sync,
{
    /// Wrap a length accessor
    pub fn new(entry_size_estimate: u64, len_fn: F) -> Self {
        Self {
            len_fn,
            entry_size_estimate,
        }
    }
}

impl<F> BoundedCollection for FnCollection<F>
where
    F: Fn() -> usize + Send + Sync,
{
    fn len(&self) -> usize {
        (self.len_fn)()
    }

    fn entry_size_estimate(&self) -> u64 {
        self.entry_size_estimate
    }

    fn trim_to(&self, _max_entries: usize) -> EvictionOutcome {
        EvictionOutcome::default()
    }
}

/// Read-only snapshot of one registered collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStat {
    /// Registration name
    pub name: String,
    /// Current cardinality in the bounded unit
    pub size: usize,
    /// Stored entries
    pub entries: usize,
    /// Approximate footprint in bytes
    pub estimated_size_bytes: u64,
    /// Configured maximum, if any
    pub max_entries: Option<usize>,
}

impl CollectionStat {
    /// Check if the collection is above its configured maximum
    pub fn over_limit(&self) -> bool {
        self.max_entries.is_some_and(|max| self.size > max)
    }
}

struct Registration {
    name: String,
    collection: Arc<dyn BoundedCollection>,
    max_entries: Option<usize>,
}

/// Named collections observed by the memory monitor
#[derive(Default)]
pub struct CollectionRegistry {
    entries: RwLock<Vec<Registration>>,
}

impl CollectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection, replacing any registration with the same name
    pub fn register<C>(&self, name: impl Into<String>, collection: Arc<C>, max_entries: Option<usize>)
    where
        C: BoundedCollection + 'static,
    {
        let name = name.into();
        let collection: Arc<dyn BoundedCollection> = collection;
        let mut entries = self.entries.write();
        entries.retain(|entry| entry.name != name);
        debug!("Registered collection '{}' (max {:?})", name, max_entries);
        entries.push(Registration {
            name,
            collection,
            max_entries,
        });
    }

    /// Remove a registration. Returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        entries.len() != before
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.name.clone()).collect()
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot every collection
    pub fn stats(&self) -> Vec<CollectionStat> {
        self.entries
            .read()
            .iter()
            .map(|entry| CollectionStat {
                name: entry.name.clone(),
                size: entry.collection.len(),
                entries: entry.collection.entry_count(),
                estimated_size_bytes: entry.collection.estimated_bytes(),
                max_entries: entry.max_entries,
            })
            .collect()
    }

    /// Sweep expired entries everywhere, then trim collections above their maximum
    pub fn enforce_limits(&self) -> EvictionOutcome {
        let targets: Vec<(String, Arc<dyn BoundedCollection>, Option<usize>)> = self
            .entries
            .read()
            .iter()
            .map(|e| (e.name.clone(), Arc::clone(&e.collection), e.max_entries))
            .collect();

        let mut total = EvictionOutcome::default();
        for (name, collection, max_entries) in targets {
            let mut outcome = collection.sweep_expired();
            if let Some(max) = max_entries {
                if collection.len() > max {
                    outcome += collection.trim_to(max);
                }
            }
            if !outcome.is_empty() {
                debug!(
                    "Collection '{}': cleared {} entries (~{} bytes)",
                    name, outcome.entries_cleared, outcome.bytes_freed
                );
            }
            total += outcome;
        }
        total
    }
}

// =============================================================================
// Tests
// =============================================================================
