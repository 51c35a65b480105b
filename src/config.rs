//! Lifecycle Configuration
//!
//! Aggregate configuration for the cache, cooldown tracker and memory manager.
//! Every component also accepts its own config struct directly; this module only
//! adds a serde-friendly wrapper so the host process can keep all tunables in one
//! YAML document next to its other settings.
//!
//! ```yaml
//! cache:
//!   default_ttl: 5m
//!   max_entities: 5000
//! cooldown:
//!   cleanup_interval: 5m
//! memory:
//!   monitor_interval: 60s
//!   history_capacity: 100
//! log:
//!   level: debug
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::cache::CacheConfig;
use crate::cooldown::CooldownTrackerConfig;
use crate::error::{Error, Result};
use crate::memory::MemoryConfig;
use crate::telemetry::LogConfig;

/// Configuration for every lifecycle component
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Guild configuration cache
    pub cache: CacheConfig,
    /// Command cooldown tracker
    pub cooldown: CooldownTrackerConfig,
    /// Process memory monitor and manager
    pub memory: MemoryConfig,
    /// Subscriber settings for [`init_logging`](crate::telemetry::init_logging)
    pub log: LogConfig,
}

impl LifecycleConfig {
    /// Decode a configuration document and validate it
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every component configuration
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.cooldown.validate()?;
        self.memory.validate()
    }
}

/// Parse a human duration such as `"90s"`, `"5m"`, `"1h30m"` or `"250ms"`.
///
/// A trailing bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::DurationParse("empty duration string".to_string()));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(Error::DurationParse(format!(
                "expected a number in duration: {}",
                s
            )));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| Error::DurationParse(format!("invalid number in duration: {}", s)))?;
        rest = &rest[digits..];

        let unit_len = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let out_of_range = || Error::DurationParse(format!("duration out of range: {}", s));
        let secs = |factor: u64| value.checked_mul(factor).ok_or_else(out_of_range);

        let part = match unit.to_ascii_lowercase().as_str() {
            "ms" => Duration::from_millis(value),
            "" | "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(secs(60)?),
            "h" => Duration::from_secs(secs(3600)?),
            "d" => Duration::from_secs(secs(86400)?),
            other => {
                return Err(Error::DurationParse(format!(
                    "unknown duration unit: {}",
                    other
                )))
            }
        };
        total = total.checked_add(part).ok_or_else(out_of_range)?;
    }

    Ok(total)
}

/// Serde adapter for [`Duration`] fields written as human durations
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_duration_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1m500ms").unwrap(), Duration::from_millis(60_500));
        assert_eq!(parse_duration(" 45 ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert_matches!(parse_duration(""), Err(Error::DurationParse(_)));
        assert_matches!(parse_duration("m"), Err(Error::DurationParse(_)));
        assert_matches!(parse_duration("10y"), Err(Error::DurationParse(_)));
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert_matches!(
            parse_duration("999999999999999999d"),
            Err(Error::DurationParse(_))
        );
        assert_matches!(
            parse_duration("9999999999999999999s9999999999999999999s"),
            Err(Error::DurationParse(_))
        );

        let yaml = "cache:\n  default_ttl: 9999999999999999999s9999999999999999999s\n";
        assert_matches!(
            LifecycleConfig::from_yaml_str(yaml),
            Err(Error::ConfigDecode(_))
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        LifecycleConfig::default().validate().unwrap();
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
cache:
  default_ttl: 2m
  max_entities: 10
cooldown:
  cleanup_interval: 30
memory:
  monitor_interval: 15s
  history_capacity: 64
  leak_window: 8
log:
  level: debug
  json: true
"#;
        let config = LifecycleConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.cache.default_ttl, Duration::from_secs(120));
        assert_eq!(config.cache.max_entities, 10);
        assert_eq!(config.cooldown.cleanup_interval, Duration::from_secs(30));
        assert_eq!(config.memory.monitor_interval, Duration::from_secs(15));
        assert_eq!(config.memory.history_capacity, 64);
        assert_eq!(config.memory.leak_window, 8);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
        // Untouched fields keep their defaults
        assert_eq!(config.cache.cleanup_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_from_yaml_rejects_invalid_values() {
        let yaml = "cache:\n  max_entities: 0\n";
        assert_matches!(
            LifecycleConfig::from_yaml_str(yaml),
            Err(Error::InvalidConfig { field: "cache.max_entities", .. })
        );

        let yaml = "memory:\n  monitor_interval: soon\n";
        assert_matches!(
            LifecycleConfig::from_yaml_str(yaml),
            Err(Error::ConfigDecode(_))
        );
    }
}
