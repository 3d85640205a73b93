//! Adaptive Media Cache - On-Device Segment Cache Engine
//!
//! A single-node, on-disk cache for downloaded media segments with bounded
//! capacity, internal LRU eviction, strategy-driven re-sizing, startup
//! preload, and continuous health monitoring.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Cache Engine                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────────┐   │
//! │  │   Strategy   │  │   Preload    │  │       Health Monitor         │   │
//! │  │  Optimizer   │  │  Scheduler   │  │   (periodic background)      │   │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┬───────────────┘   │
//! │         │                 │                         │                    │
//! │         └─────────────────┼─────────────────────────┘                    │
//! │                           │                                              │
//! │                 ┌─────────┴──────────┐       ┌────────────────────┐     │
//! │                 │   Content Store    │◄──────┤ Maintenance Runner │     │
//! │                 │  (LRU-evicting)    │       └────────────────────┘     │
//! │                 └────────────────────┘                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                         Features                                         │
//! │  • Capacity-bounded LRU eviction   • Strategy tiers (minimal→aggressive)│
//! │  • 1 MiB segment preload           • Composite health scoring           │
//! │  • Atomic per-field metrics        • Ordered broadcast event stream     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use adaptive_media_cache::{CacheEngine, CacheStrategy, ContentInfo, EngineOptions};
//! use adaptive_media_cache::preload::SimulatedFetcher;
//! use std::sync::Arc;
//!
//! let engine = CacheEngine::initialize(
//!     EngineOptions::with_dir("/var/cache/player"),
//!     Arc::new(SimulatedFetcher::instant()),
//! ).await?;
//!
//! engine.optimize_cache(CacheStrategy::Aggressive, &ContentInfo::default()).await;
//! let segments = engine.preload_initial_segments("video://episode-1", 10 * 1024 * 1024).await;
//! println!("preloaded {} segments, hit ratio {:.2}", segments, engine.cache_hit_ratio());
//!
//! engine.cleanup().await;
//! ```
//!
//! # Modules
//!
//! - [`engine`]: The engine facade and derived statistics
//! - [`store`]: Content store trait plus disk and memory backends
//! - [`strategy`]: Strategy derivation and adjustment mapping
//! - [`preload`]: Preload task records and the segment fetcher port
//! - [`health`]: Composite health scoring
//! - [`maintenance`]: Stale-entry reclamation
//! - [`metrics`]: Atomic counters and usage history
//! - [`events`]: The engine's broadcast event stream
//! - [`error`]: Error types and handling

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod health;
pub mod maintenance;
pub mod metrics;
pub mod preload;
pub mod store;
pub mod strategy;

// Re-export commonly used types
pub use config::{CacheConfig, CacheStrategy, EngineOptions};
pub use engine::{CacheEngine, CacheStatistics};
pub use error::{Error, Result};
pub use events::EngineEvent;
pub use health::{CacheHealth, HealthStatus};
pub use maintenance::{MaintenanceReport, MaintenanceRunner};
pub use metrics::{CacheMetrics, CacheUsageEntry, MetricsSnapshot};
pub use preload::{PreloadStatus, PreloadTask, SegmentFetcher, SEGMENT_SIZE};
pub use store::{DiskStore, MemoryStore, SegmentKey, SegmentStore, SegmentStoreRef};
pub use strategy::{ContentInfo, ContentType, NetworkQuality};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
