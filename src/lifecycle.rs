//! Startup Wiring
//!
//! Builds every lifecycle component from one [`LifecycleConfig`], registers the
//! cache and the cooldown tracker with the memory monitor, and owns the
//! background tasks. The host constructs one [`Lifecycle`] at startup and hands
//! `Arc` clones of the components to whoever needs them.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::config::LifecycleConfig;
use crate::cooldown::CooldownTracker;
use crate::error::Result;
use crate::memory::{BoundedCollection, MemoryManager, MemoryMonitor, MemoryProbe, SystemProbe};
use crate::timer::PeriodicTask;

/// Registration name of the guild cache
pub const CACHE_COLLECTION: &str = "guild-cache";

/// Registration name of the cooldown tracker
pub const COOLDOWN_COLLECTION: &str = "cooldowns";

/// Cache, cooldown tracker and memory manager wired together
pub struct Lifecycle<V> {
    cache: Arc<TtlCache<V>>,
    cooldowns: Arc<CooldownTracker>,
    memory: MemoryManager,
    sweepers: Mutex<Vec<PeriodicTask>>,
}

impl<V: Send + 'static> Lifecycle<V> {
    /// Build all components, sampling the current process
    pub fn new(config: LifecycleConfig) -> Result<Self> {
        Self::with_probe(config, SystemProbe::new()?)
    }

    /// Build all components with a custom memory probe
    pub fn with_probe(config: LifecycleConfig, probe: impl MemoryProbe + 'static) -> Result<Self> {
        config.validate()?;

        let max_entities = config.cache.max_entities;
        let cache = Arc::new(TtlCache::with_config(config.cache)?);
        let cooldowns = Arc::new(CooldownTracker::with_config(config.cooldown)?);
        let monitor = MemoryMonitor::with_probe(config.memory, probe)?;

        monitor.register(CACHE_COLLECTION, Arc::clone(&cache), Some(max_entities));
        monitor.register(COOLDOWN_COLLECTION, Arc::clone(&cooldowns), None);

        Ok(Self {
            cache,
            cooldowns,
            memory: MemoryManager::new(Arc::new(monitor)),
            sweepers: Mutex::new(Vec::new()),
        })
    }

    /// Guild configuration cache
    pub fn cache(&self) -> &Arc<TtlCache<V>> {
        &self.cache
    }

    /// Command cooldown tracker
    pub fn cooldowns(&self) -> &Arc<CooldownTracker> {
        &self.cooldowns
    }

    /// Memory manager
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Register an additional collection with the memory monitor
    pub fn register_collection<C>(&self, name: impl Into<String>, collection: Arc<C>, max_entries: Option<usize>)
    where
        C: BoundedCollection + 'static,
    {
        self.memory.monitor().register(name, collection, max_entries);
    }

    /// Start the cache and cooldown sweeps and the memory manager.
    ///
    /// Must be called inside a Tokio runtime. A second call logs a warning.
    pub fn start(&self) -> Result<()> {
        let mut sweepers = self.sweepers.lock();
        if !sweepers.is_empty() {
            warn!("Lifecycle already started, ignoring start");
            return Ok(());
        }

        let cache_task = self.cache.spawn_cleanup()?;
        let cooldown_task = self.cooldowns.spawn_cleanup()?;
        self.memory.start()?;

        sweepers.push(cache_task);
        sweepers.push(cooldown_task);
        info!("Lifecycle services started");
        Ok(())
    }

    /// Stop every background task. A no-op when not started.
    pub fn stop(&self) {
        let sweepers: Vec<PeriodicTask> = self.sweepers.lock().drain(..).collect();
        if sweepers.is_empty() {
            return;
        }
        for task in sweepers {
            task.stop();
        }
        self.memory.stop();
        info!("Lifecycle services stopped");
    }

    /// Check if the background tasks are running
    pub fn is_running(&self) -> bool {
        !self.sweepers.lock().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
