//! Memory Report
//!
//! Point-in-time view combining the current process sample, every registered
//! collection and the leak heuristic, plus an overall health verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::TrendAnalysis;
use super::registry::CollectionStat;
use super::sample::MemorySample;
use crate::error::Result;

/// Overall memory health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Within limits and no growth trend
    Healthy,
    /// Leak suspected or heap above the warning threshold
    Degraded,
    /// Heap above the critical threshold
    Unhealthy,
}

impl HealthStatus {
    /// Derive the status from heap usage and the leak flag
    pub fn assess(
        heap_used_percent: f64,
        leak_suspected: bool,
        warn_percent: f64,
        critical_percent: f64,
    ) -> Self {
        if heap_used_percent >= critical_percent {
            HealthStatus::Unhealthy
        } else if leak_suspected || heap_used_percent >= warn_percent {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Check if status is healthy
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "Healthy"),
            HealthStatus::Degraded => write!(f, "Degraded"),
            HealthStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// Aggregated memory report
#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    /// When the report was built
    pub generated_at: DateTime<Utc>,
    /// Fresh process sample
    pub current: MemorySample,
    /// Heap used as a percentage of heap total
    pub heap_used_percent: f64,
    /// Per-collection statistics
    pub collections: Vec<CollectionStat>,
    /// Sum of collection byte estimates
    pub total_estimated_bytes: u64,
    /// Sum of stored entries across collections
    pub total_entries: usize,
    /// Leak heuristic verdict
    pub leak_suspected: bool,
    /// Window comparison, once enough samples exist
    pub trend: Option<TrendAnalysis>,
    /// Samples currently held in history
    pub samples_tracked: usize,
    /// Overall verdict
    pub status: HealthStatus,
}

impl MemoryReport {
    /// Look up one collection by name
    pub fn collection(&self, name: &str) -> Option<&CollectionStat> {
        self.collections.iter().find(|stat| stat.name == name)
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_assessment() {
        assert_eq!(HealthStatus::assess(10.0, false, 75.0, 90.0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::assess(10.0, true, 75.0, 90.0), HealthStatus::Degraded);
        assert_eq!(HealthStatus::assess(80.0, false, 75.0, 90.0), HealthStatus::Degraded);
        assert_eq!(HealthStatus::assess(95.0, true, 75.0, 90.0), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Degraded.is_healthy());
        assert!(!HealthStatus::Unhealthy.is_operational());
        assert_eq!(HealthStatus::Unhealthy.to_string(), "Unhealthy");
    }

    #[test]
    fn test_report_json() {
        let report = MemoryReport {
            generated_at: Utc::now(),
            current: MemorySample::new(100, 1000, 0, 100),
            heap_used_percent: 10.0,
            collections: vec![CollectionStat {
                name: "guild-cache".to_string(),
                size: 2,
                entries: 3,
                estimated_size_bytes: 768,
                max_entries: Some(100),
            }],
            total_estimated_bytes: 768,
            total_entries: 3,
            leak_suspected: false,
            trend: None,
            samples_tracked: 0,
            status: HealthStatus::Healthy,
        };

        assert_eq!(report.collection("guild-cache").unwrap().entries, 3);
        assert!(report.collection("missing").is_none());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"guild-cache\""));
        assert!(json.contains("\"Healthy\""));
        assert!(json.contains("\"trend\": null"));
    }
}
