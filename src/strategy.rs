//! Strategy Optimizer
//!
//! Pure derivation of a concrete cache configuration from a named strategy
//! plus contextual signals, and the keyword mapping used by performance
//! adjustment. Derivations always key off the base configuration, never
//! the currently applied one, so applying the same strategy twice yields
//! the same result.

use crate::config::{CacheConfig, CacheStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Contextual Signals
// =============================================================================

/// Broad content category being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Audio,
    /// Live streams benefit little from deep preload
    LiveStream,
    #[default]
    Unknown,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Video => write!(f, "video"),
            ContentType::Audio => write!(f, "audio"),
            ContentType::LiveStream => write!(f, "live"),
            ContentType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Observed network quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkQuality {
    Poor,
    Fair,
    #[default]
    Good,
    Excellent,
}

/// Contextual hints for strategy derivation
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentInfo {
    /// Content category
    pub content_type: ContentType,
    /// Current network quality
    pub network_quality: NetworkQuality,
}

// =============================================================================
// Strategy Plan
// =============================================================================

/// Minimum preload span retained under memory pressure
pub const PRELOAD_FLOOR: Duration = Duration::from_secs(10);

/// A derived configuration plus its telemetry description
#[derive(Debug, Clone)]
pub struct StrategyPlan {
    /// Strategy the plan was derived from
    pub strategy: CacheStrategy,
    /// The configuration to apply
    pub config: CacheConfig,
    /// Human-readable description for telemetry
    pub description: String,
}

/// Derive a concrete configuration from a strategy and context
///
/// Pure function of (strategy, base, content info); never fails for valid
/// strategy values.
pub fn plan(strategy: CacheStrategy, base: CacheConfig, content: &ContentInfo) -> StrategyPlan {
    let (config, summary) = match strategy {
        CacheStrategy::Minimal => (
            CacheConfig::new(
                base.max_cache_size / 4,
                base.preload_duration.min(PRELOAD_FLOOR),
            ),
            "quarter capacity, preload floor".to_string(),
        ),
        CacheStrategy::Conservative => (
            CacheConfig::new(base.max_cache_size / 2, base.preload_duration / 2),
            "half capacity, half preload".to_string(),
        ),
        CacheStrategy::Normal => (base, "base capacity and preload".to_string()),
        CacheStrategy::Aggressive => (
            CacheConfig::new(base.max_cache_size, base.preload_duration * 2),
            "full capacity with extended preload".to_string(),
        ),
    };

    let description = format!(
        "{} strategy for {} content on {:?} network: {}",
        strategy, content.content_type, content.network_quality, summary
    );

    StrategyPlan {
        strategy,
        config,
        description,
    }
}

// =============================================================================
// Performance Adjustment
// =============================================================================

/// Map a free-text performance analysis to a strategy
///
/// Recognized categories: degraded network (trade storage for fewer
/// re-fetches), low storage (halve capacity and preload), memory pressure
/// (quarter capacity with a preload floor). Anything else is a no-op.
pub fn categorize_adjustment(analysis: &str) -> Option<CacheStrategy> {
    let lowered = analysis.to_lowercase();

    if lowered.contains("network") {
        Some(CacheStrategy::Aggressive)
    } else if lowered.contains("storage") {
        Some(CacheStrategy::Conservative)
    } else if lowered.contains("memory") {
        Some(CacheStrategy::Minimal)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CacheConfig {
        CacheConfig::new(100 * 1024 * 1024, Duration::from_secs(30))
    }

    #[test]
    fn test_capacity_derivations() {
        let info = ContentInfo::default();

        let minimal = plan(CacheStrategy::Minimal, base(), &info);
        assert_eq!(minimal.config.max_cache_size, 25 * 1024 * 1024);
        assert_eq!(minimal.config.preload_duration, Duration::from_secs(10));

        let conservative = plan(CacheStrategy::Conservative, base(), &info);
        assert_eq!(conservative.config.max_cache_size, 50 * 1024 * 1024);
        assert_eq!(conservative.config.preload_duration, Duration::from_secs(15));

        let normal = plan(CacheStrategy::Normal, base(), &info);
        assert_eq!(normal.config, base());

        let aggressive = plan(CacheStrategy::Aggressive, base(), &info);
        assert_eq!(aggressive.config.max_cache_size, 100 * 1024 * 1024);
        assert_eq!(aggressive.config.preload_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_aggressive_description_mentions_extended_preload() {
        let plan = plan(CacheStrategy::Aggressive, base(), &ContentInfo::default());
        assert!(plan.description.contains("extended preload"));
    }

    #[test]
    fn test_idempotence() {
        let info = ContentInfo {
            content_type: ContentType::Video,
            network_quality: NetworkQuality::Poor,
        };

        let first = plan(CacheStrategy::Conservative, base(), &info);
        let second = plan(CacheStrategy::Conservative, base(), &info);
        assert_eq!(first.config, second.config);
        assert_eq!(first.description, second.description);
    }

    #[test]
    fn test_preload_floor_short_base() {
        // A base preload shorter than the floor stays as-is under Minimal
        let short = CacheConfig::new(1024, Duration::from_secs(5));
        let plan = plan(CacheStrategy::Minimal, short, &ContentInfo::default());
        assert_eq!(plan.config.preload_duration, Duration::from_secs(5));
    }

    #[test]
    fn test_adjustment_categorization() {
        assert_eq!(
            categorize_adjustment("network degraded"),
            Some(CacheStrategy::Aggressive)
        );
        assert_eq!(
            categorize_adjustment("Storage low on device"),
            Some(CacheStrategy::Conservative)
        );
        assert_eq!(
            categorize_adjustment("memory pressure reported"),
            Some(CacheStrategy::Minimal)
        );
        assert_eq!(categorize_adjustment("all good"), None);
        assert_eq!(categorize_adjustment(""), None);
    }
}
