//! Cache Health
//!
//! Composite health scoring recomputed on demand from live metrics. The
//! score combines hit ratio, storage efficiency, and inverse usage
//! pressure; it is never persisted or cached across calls.

use crate::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Health Status
// =============================================================================

/// Health tier derived from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Score above 0.8
    Excellent,
    /// Score above 0.6
    Good,
    /// Score above 0.4
    Fair,
    /// Score at or below 0.4
    Poor,
}

impl HealthStatus {
    /// Classify a score into a tier
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            HealthStatus::Excellent
        } else if score > 0.6 {
            HealthStatus::Good
        } else if score > 0.4 {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Excellent => write!(f, "excellent"),
            HealthStatus::Good => write!(f, "good"),
            HealthStatus::Fair => write!(f, "fair"),
            HealthStatus::Poor => write!(f, "poor"),
        }
    }
}

// =============================================================================
// Cache Health
// =============================================================================

/// Derived health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    /// Composite score in [0,1]
    pub score: f64,
    /// Tier classification of the score
    pub status: HealthStatus,
    /// Usage percentage the score was computed from
    pub usage_percent: f64,
    /// Advisory text for operators/telemetry, not user-facing prompts
    pub recommendations: Vec<String>,
}

/// Compute health from a metrics snapshot and current usage
///
/// Score formula: `(hit_ratio + storage_efficiency + (1 - min(usage/100, 1))) / 3`
/// where `hit_ratio` is hits over total requests (0 when idle) and
/// storage efficiency is clamped into [0,1] so the score stays bounded
/// even while counters race.
pub fn compute_health(snapshot: &MetricsSnapshot, current_size: u64, max_size: u64) -> CacheHealth {
    let usage_percent = if max_size == 0 {
        0.0
    } else {
        current_size as f64 / max_size as f64 * 100.0
    };

    let hit_ratio = snapshot.hit_ratio();

    let storage_efficiency = if snapshot.total_bytes_written == 0 {
        1.0
    } else {
        (current_size as f64 / snapshot.total_bytes_written as f64).clamp(0.0, 1.0)
    };

    let usage_pressure = 1.0 - (usage_percent / 100.0).min(1.0);

    let score = (hit_ratio + storage_efficiency + usage_pressure) / 3.0;

    CacheHealth {
        score,
        status: HealthStatus::from_score(score),
        usage_percent,
        recommendations: recommendations(snapshot, usage_percent, hit_ratio),
    }
}

fn recommendations(snapshot: &MetricsSnapshot, usage_percent: f64, hit_ratio: f64) -> Vec<String> {
    let mut out = Vec::new();

    if usage_percent > 90.0 {
        out.push(
            "cache is nearly full; run maintenance or lower the capacity demand".to_string(),
        );
    }

    let requests = snapshot.read_requests + snapshot.write_requests;
    if requests > 0 && hit_ratio < 0.3 {
        out.push(
            "hit ratio is low; consider a more aggressive strategy or longer preload".to_string(),
        );
    }

    if snapshot.evictions > snapshot.write_requests && snapshot.evictions > 0 {
        out.push("eviction churn exceeds writes; capacity may be undersized".to_string());
    }

    if out.is_empty() {
        out.push("cache is operating normally".to_string());
    }

    out
}
