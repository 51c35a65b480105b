//! Scoped Cooldown Tracker
//!
//! Records when a command was last used per scope and answers whether it is
//! still cooling down. Cooldowns are advisory: losing them on restart is fine.
//!
//! # Expiry
//!
//! Entries are removed lazily when a check finds them expired, and by a periodic
//! sweep (default every 5 minutes). There is no per-entry timer, so an idle
//! expired entry can linger until the next sweep or read; in exchange the tracker
//! costs one background task instead of one per active cooldown.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scope::{cooldown_key, CooldownContext, Scope};
use super::{DEFAULT_CLEANUP_INTERVAL, ENTRY_SIZE_ESTIMATE};
use crate::config::deserialize_duration;
use crate::error::{Error, Result};
use crate::memory::{BoundedCollection, EvictionOutcome};
use crate::timer::PeriodicTask;

/// Cooldown settings for one command
///
/// Deserializes from `{ scope: "user", duration: 5 }` or
/// `{ scope: ["user", "guild"], duration: "1m" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCooldownConfig")]
pub struct CooldownConfig {
    scopes: Vec<Scope>,
    duration: Duration,
}

impl CooldownConfig {
    /// Cooldown on one scope
    pub fn new(scope: Scope, duration: Duration) -> Result<Self> {
        Self::multi([scope], duration)
    }

    /// Cooldown on several scopes at once; active if any one of them is
    pub fn multi(scopes: impl IntoIterator<Item = Scope>, duration: Duration) -> Result<Self> {
        let mut scopes: Vec<Scope> = scopes.into_iter().collect();
        scopes.sort();
        scopes.dedup();

        if scopes.is_empty() {
            return Err(Error::InvalidCooldown("at least one scope is required".to_string()));
        }
        if duration.is_zero() {
            return Err(Error::InvalidCooldown(
                "duration must be greater than zero".to_string(),
            ));
        }
        Ok(Self { scopes, duration })
    }

    /// Per-user cooldown of `secs` seconds
    pub fn per_user_secs(secs: u64) -> Result<Self> {
        Self::new(Scope::User, Duration::from_secs(secs))
    }

    /// Scopes, deduplicated
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Cooldown duration
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[derive(Deserialize)]
struct RawCooldownConfig {
    scope: OneOrMany,
    #[serde(deserialize_with = "deserialize_duration")]
    duration: Duration,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scope),
    Many(Vec<Scope>),
}

impl TryFrom<RawCooldownConfig> for CooldownConfig {
    type Error = Error;

    fn try_from(raw: RawCooldownConfig) -> Result<Self> {
        match raw.scope {
            OneOrMany::One(scope) => Self::new(scope, raw.duration),
            OneOrMany::Many(scopes) => Self::multi(scopes, raw.duration),
        }
    }
}

/// Tracker-wide settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CooldownTrackerConfig {
    /// Interval of the background sweep
    #[serde(deserialize_with = "deserialize_duration")]
    pub cleanup_interval: Duration,
    /// Approximate bytes per entry, for reporting only
    pub entry_size_estimate: u64,
}

impl Default for CooldownTrackerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            entry_size_estimate: ENTRY_SIZE_ESTIMATE,
        }
    }
}

impl CooldownTrackerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval.is_zero() {
            return Err(Error::invalid_config(
                "cooldown.cleanup_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Result of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    /// Whether any scope is still active
    pub on_cooldown: bool,
    /// Longest remaining time across active scopes
    pub time_left: Option<Duration>,
}

impl CooldownStatus {
    /// Not on cooldown
    pub fn ready() -> Self {
        Self {
            on_cooldown: false,
            time_left: None,
        }
    }

    /// On cooldown for `time_left`
    pub fn active(time_left: Duration) -> Self {
        Self {
            on_cooldown: true,
            time_left: Some(time_left),
        }
    }

    /// Remaining seconds rounded up to one decimal, for display
    pub fn time_left_secs(&self) -> Option<f64> {
        self.time_left
            .map(|left| (left.as_secs_f64() * 10.0).ceil() / 10.0)
    }
}

/// Cooldown tracker statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CooldownStats {
    /// Stored entries, including expired ones not yet swept
    pub entries: usize,
    /// Entries still active
    pub active: usize,
    /// Approximate footprint in bytes
    pub estimated_bytes: u64,
}

#[derive(Debug, Clone)]
struct CooldownEntry {
    command: String,
    set_at: Instant,
    expires_at: Instant,
}

/// Multi-scope command cooldown tracker
pub struct CooldownTracker {
    config: CooldownTrackerConfig,
    entries: Mutex<HashMap<String, CooldownEntry>>,
}

impl CooldownTracker {
    /// Create a tracker with the default configuration
    pub fn new() -> Self {
        Self::build(CooldownTrackerConfig::default())
    }

    /// Create a tracker with a custom configuration
    pub fn with_config(config: CooldownTrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CooldownTrackerConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &CooldownTrackerConfig {
        &self.config
    }

    /// Check every scope of `config`.
    ///
    /// Expired entries found along the way are deleted. The command is on
    /// cooldown if any scope is active, and the longest remaining time wins.
    pub fn is_on_cooldown(
        &self,
        command: &str,
        config: &CooldownConfig,
        ctx: &CooldownContext<'_>,
    ) -> CooldownStatus {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut longest: Option<Duration> = None;

        for &scope in config.scopes() {
            let key = cooldown_key(command, scope, ctx);
            let Some(expires_at) = entries.get(&key).map(|entry| entry.expires_at) else {
                continue;
            };

            if now < expires_at {
                let left = expires_at - now;
                longest = Some(longest.map_or(left, |current| current.max(left)));
            } else {
                entries.remove(&key);
            }
        }

        longest.map_or_else(CooldownStatus::ready, CooldownStatus::active)
    }

    /// Start the cooldown on every scope of `config`, overwriting any existing entry
    pub fn set_cooldown(&self, command: &str, config: &CooldownConfig, ctx: &CooldownContext<'_>) {
        let now = Instant::now();
        let expires_at = now + config.duration();
        let mut entries = self.entries.lock();

        for &scope in config.scopes() {
            entries.insert(
                cooldown_key(command, scope, ctx),
                CooldownEntry {
                    command: command.to_string(),
                    set_at: now,
                    expires_at,
                },
            );
        }
    }

    /// Remove one scoped entry. Returns whether it existed.
    pub fn clear_cooldown(&self, command: &str, scope: Scope, ctx: &CooldownContext<'_>) -> bool {
        let key = cooldown_key(command, scope, ctx);
        self.entries.lock().remove(&key).is_some()
    }

    /// Remove every entry of `command`, across all scopes and identities
    pub fn clear_command_cooldowns(&self, command: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.command != command);
        let removed = before - entries.len();
        debug!("Cleared {} cooldowns for command '{}'", removed, command);
        removed
    }

    /// Remaining time on one scoped entry, if active
    pub fn time_left(&self, command: &str, scope: Scope, ctx: &CooldownContext<'_>) -> Option<Duration> {
        let key = cooldown_key(command, scope, ctx);
        let now = Instant::now();
        self.entries
            .lock()
            .get(&key)
            .map(|entry| entry.expires_at.saturating_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// Sweep every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Cooldown cleanup removed {} expired entries", removed);
        }
        removed
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Get a statistics snapshot
    pub fn stats(&self) -> CooldownStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        let active = entries.values().filter(|entry| now < entry.expires_at).count();

        CooldownStats {
            entries: entries.len(),
            active,
            estimated_bytes: entries.len() as u64 * self.config.entry_size_estimate,
        }
    }

    /// Spawn the periodic cleanup sweep on the current Tokio runtime.
    ///
    /// The task holds a weak reference and ends once the tracker is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>) -> Result<PeriodicTask> {
        let tracker: Weak<Self> = Arc::downgrade(self);
        PeriodicTask::spawn("cooldown-cleanup", self.config.cleanup_interval, move || {
            match tracker.upgrade() {
                Some(tracker) => {
                    tracker.cleanup_expired();
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }
        })
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedCollection for CooldownTracker {
    fn len(&self) -> usize {
        CooldownTracker::len(self)
    }

    fn entry_size_estimate(&self) -> u64 {
        self.config.entry_size_estimate
    }

    fn sweep_expired(&self) -> EvictionOutcome {
        EvictionOutcome::new(self.cleanup_expired(), self.config.entry_size_estimate)
    }

    /// Oldest cooldowns go first
    fn trim_to(&self, max_entries: usize) -> EvictionOutcome {
        let mut entries = self.entries.lock();
        if entries.len() <= max_entries {
            return EvictionOutcome::default();
        }

        let mut by_age: Vec<(Instant, String)> = entries
            .iter()
            .map(|(key, entry)| (entry.set_at, key.clone()))
            .collect();
        by_age.sort();

        let excess = entries.len() - max_entries;
        for (_, key) in by_age.into_iter().take(excess) {
            entries.remove(&key);
        }
        debug!("Trimmed {} oldest cooldown entries", excess);
        EvictionOutcome::new(excess, self.config.entry_size_estimate)
    }
}

// =============================================================================
// Tests
// =============================================================================
