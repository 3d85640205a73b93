//! Engine Events
//!
//! A single ordered stream of lifecycle and state-change notifications.
//! Every state-changing operation emits exactly one terminal event
//! (success or `Error`) plus zero or more progress events. Late
//! subscribers only see events from their join point forward.

use crate::config::CacheStrategy;
use crate::health::CacheHealth;
use serde::{Deserialize, Serialize};

/// Events published on the engine's broadcast channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine finished initialization
    Initialized {
        max_cache_size: u64,
        preload_duration_ms: u64,
    },

    /// A strategy was applied via optimize
    StrategyChanged {
        strategy: CacheStrategy,
        description: String,
    },

    /// A strategy was applied via performance adjustment
    ConfigurationChanged {
        strategy: CacheStrategy,
        description: String,
    },

    /// A new configuration became active
    ConfigurationApplied {
        max_cache_size: u64,
        preload_duration_ms: u64,
    },

    /// A named mode preset was enabled
    ModeChanged { mode: String },

    /// Preload made progress for one content item
    PreloadProgress { uri: String, progress: f64 },

    /// Preload finished for one content item
    PreloadCompleted { uri: String, segments: u32 },

    /// Periodic health sample
    HealthUpdate { health: CacheHealth },

    /// Maintenance pass finished
    MaintenanceCompleted { reclaimed: u64 },

    /// Cache was fully wiped
    CacheCleared,

    /// A recoverable fault was caught at an operation boundary
    Error { operation: String, message: String },
}

impl EngineEvent {
    /// Create an error event from any displayable fault
    pub fn error(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        EngineEvent::Error {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Create a progress event
    pub fn progress(uri: impl Into<String>, progress: f64) -> Self {
        EngineEvent::PreloadProgress {
            uri: uri.into(),
            progress,
        }
    }

    /// Get the URI associated with this event (if any)
    pub fn uri(&self) -> Option<&str> {
        match self {
            EngineEvent::PreloadProgress { uri, .. } => Some(uri),
            EngineEvent::PreloadCompleted { uri, .. } => Some(uri),
            _ => None,
        }
    }

    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(self, EngineEvent::Error { .. })
    }
}
