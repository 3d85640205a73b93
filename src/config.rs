//! Cache Configuration
//!
//! Defines the immutable cache configuration value, the strategy tiers that
//! drive config derivation, and the engine options supplied at startup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Defaults
// =============================================================================

/// Default maximum cache size: 100 MiB
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 100 * 1024 * 1024;

/// Default preload duration: 30 seconds of content
pub const DEFAULT_PRELOAD_DURATION: Duration = Duration::from_secs(30);

/// Default health monitor tick interval
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Default maximum elapsed time between maintenance passes
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default idle age after which an entry is considered stale
pub const DEFAULT_MAX_ENTRY_AGE: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// Cache Config
// =============================================================================

/// Immutable cache configuration value
///
/// Replaced wholesale whenever a new configuration is applied; never
/// mutated in place. Readers holding an `Arc<CacheConfig>` always observe
/// a complete configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache capacity in bytes (must be > 0)
    pub max_cache_size: u64,
    /// Amount of content to preload ahead of playback start
    pub preload_duration: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            preload_duration: DEFAULT_PRELOAD_DURATION,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration
    pub fn new(max_cache_size: u64, preload_duration: Duration) -> Self {
        Self {
            max_cache_size,
            preload_duration,
        }
    }

    /// Return a copy with a different capacity
    pub fn with_max_cache_size(self, max_cache_size: u64) -> Self {
        Self {
            max_cache_size,
            ..self
        }
    }

    /// Return a copy with a different preload duration
    pub fn with_preload_duration(self, preload_duration: Duration) -> Self {
        Self {
            preload_duration,
            ..self
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_cache_size == 0 {
            return Err(Error::Configuration(
                "max_cache_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Cache Strategy
// =============================================================================

/// Named aggressiveness tier controlling capacity and preload derivation
///
/// Ordered by increasing storage/preload aggressiveness.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Quarter capacity, minimal preload
    Minimal,
    /// Half capacity, reduced preload
    Conservative,
    /// Full base configuration
    #[default]
    Normal,
    /// Full capacity with extended preload
    Aggressive,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStrategy::Minimal => write!(f, "minimal"),
            CacheStrategy::Conservative => write!(f, "conservative"),
            CacheStrategy::Normal => write!(f, "normal"),
            CacheStrategy::Aggressive => write!(f, "aggressive"),
        }
    }
}

// =============================================================================
// Engine Options
// =============================================================================

/// Startup options for the cache engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Root directory for the on-disk content store
    pub cache_dir: PathBuf,
    /// Base cache configuration (strategy derivations key off this)
    pub config: CacheConfig,
    /// Health monitor tick interval
    pub monitor_interval: Duration,
    /// Maximum elapsed time between maintenance passes
    pub maintenance_interval: Duration,
    /// Idle age after which an entry is reclaimed by maintenance
    pub max_entry_age: Duration,
    /// Bounded usage-history capacity
    pub usage_history_capacity: usize,
    /// Event channel capacity
    pub event_channel_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("adaptive-media-cache"),
            config: CacheConfig::default(),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            max_entry_age: DEFAULT_MAX_ENTRY_AGE,
            usage_history_capacity: 100,
            event_channel_capacity: 1024,
        }
    }
}

impl EngineOptions {
    /// Create options rooted at a specific cache directory
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_cache_size, 100 * 1024 * 1024);
        assert_eq!(config.preload_duration, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = CacheConfig::default().with_max_cache_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = CacheConfig::default()
            .with_max_cache_size(1024)
            .with_preload_duration(Duration::from_secs(5));
        assert_eq!(config.max_cache_size, 1024);
        assert_eq!(config.preload_duration, Duration::from_secs(5));
    }

    #[test]
    fn test_strategy_ordering() {
        assert!(CacheStrategy::Minimal < CacheStrategy::Conservative);
        assert!(CacheStrategy::Conservative < CacheStrategy::Normal);
        assert!(CacheStrategy::Normal < CacheStrategy::Aggressive);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(format!("{}", CacheStrategy::Aggressive), "aggressive");
        assert_eq!(format!("{}", CacheStrategy::Minimal), "minimal");
    }
}
