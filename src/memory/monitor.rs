//! Process Memory Monitor
//!
//! Samples the host process into a ring buffer, runs the leak heuristic over it,
//! aggregates registered collection sizes, and asks over-limit collections to
//! trim themselves. All of it is in-memory and synchronous; scheduling belongs to
//! [`MemoryManager`](super::MemoryManager).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;

use super::history::{SampleHistory, TrendAnalysis};
use super::registry::{BoundedCollection, CollectionRegistry, CollectionStat, EvictionOutcome};
use super::report::{HealthStatus, MemoryReport};
use super::sample::{MemoryProbe, MemorySample, SystemProbe};
use super::{
    DEFAULT_CLEANUP_INTERVAL, DEFAULT_HISTORY_CAPACITY, DEFAULT_LEAK_GROWTH_THRESHOLD,
    DEFAULT_LEAK_WINDOW, DEFAULT_MONITOR_INTERVAL,
};
use crate::config::deserialize_duration;
use crate::error::{Error, Result};

/// Memory monitor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Interval of the sampling + leak check tick
    #[serde(deserialize_with = "deserialize_duration")]
    pub monitor_interval: Duration,
    /// Interval of the bounded eviction tick
    #[serde(deserialize_with = "deserialize_duration")]
    pub cleanup_interval: Duration,
    /// Ring buffer capacity
    pub history_capacity: usize,
    /// Samples per comparison window; the heuristic needs twice this many
    pub leak_window: usize,
    /// Relative growth between windows that flags a leak (0.20 = 20%)
    pub leak_growth_threshold: f64,
    /// Heap percentage reported as degraded
    pub heap_warn_percent: f64,
    /// Heap percentage reported as unhealthy
    pub heap_critical_percent: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            leak_window: DEFAULT_LEAK_WINDOW,
            leak_growth_threshold: DEFAULT_LEAK_GROWTH_THRESHOLD,
            heap_warn_percent: 75.0,
            heap_critical_percent: 90.0,
        }
    }
}

impl MemoryConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.monitor_interval.is_zero() {
            return Err(Error::invalid_config(
                "memory.monitor_interval",
                "must be greater than zero",
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(Error::invalid_config(
                "memory.cleanup_interval",
                "must be greater than zero",
            ));
        }
        if self.leak_window == 0 {
            return Err(Error::invalid_config("memory.leak_window", "must be at least 1"));
        }
        if self.history_capacity < self.leak_window * 2 {
            return Err(Error::invalid_config(
                "memory.history_capacity",
                format!(
                    "must hold two leak windows ({} samples)",
                    self.leak_window * 2
                ),
            ));
        }
        if !self.leak_growth_threshold.is_finite() || self.leak_growth_threshold <= 0.0 {
            return Err(Error::invalid_config(
                "memory.leak_growth_threshold",
                "must be a positive number",
            ));
        }
        if self.heap_warn_percent > self.heap_critical_percent {
            return Err(Error::invalid_config(
                "memory.heap_warn_percent",
                "must not exceed heap_critical_percent",
            ));
        }
        Ok(())
    }
}

/// Process memory monitor
pub struct MemoryMonitor {
    config: MemoryConfig,
    probe: Box<dyn MemoryProbe>,
    history: Mutex<SampleHistory>,
    registry: CollectionRegistry,
}

impl MemoryMonitor {
    /// Monitor the current process
    pub fn new(config: MemoryConfig) -> Result<Self> {
        Self::with_probe(config, SystemProbe::new()?)
    }

    /// Monitor through a custom probe
    pub fn with_probe(config: MemoryConfig, probe: impl MemoryProbe + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: Mutex::new(SampleHistory::new(config.history_capacity)),
            config,
            probe: Box::new(probe),
            registry: CollectionRegistry::new(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Register a collection for reporting and bounded eviction
    pub fn register<C>(&self, name: impl Into<String>, collection: Arc<C>, max_entries: Option<usize>)
    where
        C: BoundedCollection + 'static,
    {
        self.registry.register(name, collection, max_entries);
    }

    /// Remove a registration. Returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    /// Take a fresh snapshot without recording it
    pub fn get_memory_usage(&self) -> MemorySample {
        self.probe.sample()
    }

    /// Take a snapshot and append it to the history
    pub fn track_memory_usage(&self) -> MemorySample {
        let sample = self.probe.sample();
        self.history.lock().push(sample.clone());
        sample
    }

    /// Run the leak heuristic over the recorded history
    pub fn detect_memory_leak(&self) -> bool {
        self.trend().is_some_and(|trend| trend.leak_suspected)
    }

    /// Window comparison behind [`detect_memory_leak`](Self::detect_memory_leak)
    pub fn trend(&self) -> Option<TrendAnalysis> {
        self.history
            .lock()
            .analyze_trend(self.config.leak_window, self.config.leak_growth_threshold)
    }

    /// Number of samples recorded
    pub fn sample_count(&self) -> usize {
        self.history.lock().len()
    }

    /// Most recent recorded sample
    pub fn latest_sample(&self) -> Option<MemorySample> {
        self.history.lock().latest().cloned()
    }

    /// Copy of the recorded samples, oldest first
    pub fn history(&self) -> Vec<MemorySample> {
        self.history.lock().iter().cloned().collect()
    }

    /// Snapshot every registered collection
    pub fn cache_stats(&self) -> Vec<CollectionStat> {
        self.registry.stats()
    }

    /// Sweep expired entries and trim every collection above its maximum
    pub fn clear_expired_caches(&self) -> EvictionOutcome {
        self.registry.enforce_limits()
    }

    /// Build a full report from a fresh sample
    pub fn memory_report(&self) -> MemoryReport {
        let current = self.get_memory_usage();
        let collections = self.cache_stats();
        let (trend, samples_tracked) = {
            let history = self.history.lock();
            let trend =
                history.analyze_trend(self.config.leak_window, self.config.leak_growth_threshold);
            (trend, history.len())
        };

        let heap_used_percent = current.heap_used_percent();
        let leak_suspected = trend.is_some_and(|t| t.leak_suspected);
        let status = HealthStatus::assess(
            heap_used_percent,
            leak_suspected,
            self.config.heap_warn_percent,
            self.config.heap_critical_percent,
        );

        MemoryReport {
            generated_at: Utc::now(),
            heap_used_percent,
            total_estimated_bytes: collections.iter().map(|c| c.estimated_size_bytes).sum(),
            total_entries: collections.iter().map(|c| c.entries).sum(),
            current,
            collections,
            leak_suspected,
            trend,
            samples_tracked,
            status,
        }
    }
}

impl std::fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("config", &self.config)
            .field("samples", &self.sample_count())
            .field("collections", &self.registry.names())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::cooldown::{CooldownConfig, CooldownContext, CooldownTracker};
    use assert_matches::assert_matches;
    use std::collections::VecDeque;

    /// Probe replaying scripted heap values, repeating the last one
    struct ScriptedProbe {
        values: Mutex<VecDeque<u64>>,
        last: Mutex<u64>,
    }

    impl ScriptedProbe {
        fn new(values: impl IntoIterator<Item = u64>) -> Self {
            Self {
                values: Mutex::new(values.into_iter().collect()),
                last: Mutex::new(0),
            }
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn sample(&self) -> MemorySample {
            let mut last = self.last.lock();
            if let Some(next) = self.values.lock().pop_front() {
                *last = next;
            }
            MemorySample::new(*last, 1000, 0, *last)
        }
    }

    fn monitor(values: impl IntoIterator<Item = u64>) -> MemoryMonitor {
        MemoryMonitor::with_probe(MemoryConfig::default(), ScriptedProbe::new(values)).unwrap()
    }

    #[test]
    fn test_config_validation() {
        let config = MemoryConfig {
            history_capacity: 30,
            ..Default::default()
        };
        assert_matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "memory.history_capacity", .. })
        );

        let config = MemoryConfig {
            leak_growth_threshold: 0.0,
            ..Default::default()
        };
        assert_matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "memory.leak_growth_threshold", .. })
        );
    }

    #[test]
    fn test_track_appends_to_bounded_history() {
        let monitor = monitor(1..=150);
        assert_eq!(monitor.sample_count(), 0);
        assert!(monitor.latest_sample().is_none());

        for _ in 0..150 {
            monitor.track_memory_usage();
        }
        assert_eq!(monitor.sample_count(), 100);
        assert_eq!(monitor.latest_sample().unwrap().heap_used, 150);
        assert_eq!(monitor.history()[0].heap_used, 51);
    }

    #[test]
    fn test_get_memory_usage_does_not_record() {
        let monitor = monitor([5]);
        assert_eq!(monitor.get_memory_usage().heap_used, 5);
        assert_eq!(monitor.sample_count(), 0);
    }

    #[test]
    fn test_leak_detection_through_monitor() {
        let values = std::iter::repeat(100).take(20).chain(std::iter::repeat(130).take(20));
        let monitor = monitor(values);

        for _ in 0..39 {
            monitor.track_memory_usage();
            assert!(!monitor.detect_memory_leak());
        }
        monitor.track_memory_usage();
        assert!(monitor.detect_memory_leak());
    }

    #[test]
    fn test_report_aggregates_collections() {
        let cache: Arc<TtlCache<String>> = Arc::new(TtlCache::new());
        cache.set("g1", "language", "en".to_string());
        cache.set("g1", "setup", "#music".to_string());
        cache.set("g2", "language", "de".to_string());

        let cooldowns = Arc::new(CooldownTracker::new());
        let config = CooldownConfig::per_user_secs(30).unwrap();
        cooldowns.set_cooldown("play", &config, &CooldownContext::user("u1"));

        let monitor = monitor([400]);
        monitor.register("guild-cache", Arc::clone(&cache), Some(1000));
        monitor.register("cooldowns", Arc::clone(&cooldowns), None);

        let report = monitor.memory_report();
        assert_eq!(report.current.heap_used, 400);
        assert_eq!(report.heap_used_percent, 40.0);
        assert_eq!(report.collection("guild-cache").unwrap().size, 2);
        assert_eq!(report.collection("guild-cache").unwrap().entries, 3);
        assert_eq!(
            report.collection("guild-cache").unwrap().estimated_size_bytes,
            3 * crate::cache::ENTRY_SIZE_ESTIMATE
        );
        assert_eq!(report.collection("cooldowns").unwrap().size, 1);
        // Two cache entities hold three fields; totals count fields, not entities
        assert_eq!(report.total_entries, 4);
        assert!(!report.leak_suspected);
        assert!(report.trend.is_none());
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_report_status_reflects_leak_and_heap() {
        let values = std::iter::repeat(100).take(20).chain(std::iter::repeat(200).take(21));
        let monitor = monitor(values);
        for _ in 0..40 {
            monitor.track_memory_usage();
        }
        let report = monitor.memory_report();
        assert!(report.leak_suspected);
        assert_eq!(report.samples_tracked, 40);
        assert_eq!(report.status, HealthStatus::Degraded);

        let hot = self::monitor([950]);
        assert_eq!(hot.memory_report().status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_clear_expired_caches_trims_over_limit() {
        let cache: Arc<TtlCache<u32>> = Arc::new(TtlCache::new());
        for i in 0..20 {
            cache.set(format!("g{}", i), "language", i);
        }

        let monitor = monitor([1]);
        monitor.register("guild-cache", Arc::clone(&cache), Some(5));

        let outcome = monitor.clear_expired_caches();
        assert_eq!(outcome.entries_cleared, 15);
        assert_eq!(outcome.bytes_freed, 15 * crate::cache::ENTRY_SIZE_ESTIMATE);
        assert_eq!(cache.len(), 5);

        assert!(monitor.unregister("guild-cache"));
        assert!(monitor.cache_stats().is_empty());
    }
}
