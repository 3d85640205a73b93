//! Cache Engine
//!
//! Main coordinator owning the content store, metrics, active
//! configuration, preload tasks, usage history, and the event stream. One
//! engine instance is created per process lifetime; a background health
//! monitor runs from `initialize` until `cleanup`.
//!
//! All recoverable faults are caught at the operation boundary, converted
//! into an `Error` event, and replaced with a safe return value. Only
//! store initialization failure propagates: without a store the cache
//! subsystem cannot function, and the caller must degrade to direct fetch.

use crate::config::{CacheConfig, CacheStrategy, EngineOptions};
use crate::error::Result;
use crate::events::EngineEvent;
use crate::health::{compute_health, CacheHealth};
use crate::maintenance::MaintenanceRunner;
use crate::metrics::{CacheMetrics, CacheUsageEntry, MetricsSnapshot, UsageHistory};
use crate::preload::{segment_count, PreloadStatus, PreloadTask, SegmentFetcher, SEGMENT_SIZE};
use crate::store::{DiskStore, SegmentKey, SegmentStoreRef};
use crate::strategy::{self, ContentInfo, StrategyPlan};
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Derived Statistics
// =============================================================================

/// On-demand cache statistics
///
/// Computed from live state on every call; never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Current store size in bytes
    pub current_size: u64,
    /// Active capacity limit
    pub max_cache_size: u64,
    /// Usage percentage against the active limit
    pub usage_percent: f64,
    /// Counter snapshot
    pub metrics: MetricsSnapshot,
    /// Preload tasks currently in progress
    pub active_preloads: usize,
    /// `current_size / total_bytes_written` (1.0 before any write)
    pub storage_efficiency: f64,
}

// =============================================================================
// Cache Engine
// =============================================================================

/// Adaptive on-device media segment cache
pub struct CacheEngine {
    options: EngineOptions,
    /// Strategy derivations always key off this, never the active config
    base_config: CacheConfig,
    /// Replaced wholesale; readers see old or new in full
    active_config: RwLock<Arc<CacheConfig>>,
    active_strategy: RwLock<CacheStrategy>,
    store: SegmentStoreRef,
    fetcher: Arc<dyn SegmentFetcher>,
    metrics: Arc<CacheMetrics>,
    maintenance: MaintenanceRunner,
    preload_tasks: DashMap<String, PreloadTask>,
    usage_history: UsageHistory,
    event_tx: broadcast::Sender<EngineEvent>,
    shutdown: CancellationToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
    cleaned: AtomicBool,
}

impl CacheEngine {
    /// Initialize the engine with an on-disk store
    ///
    /// Opens the store rooted at `options.cache_dir`, starts the health
    /// monitor, and emits `Initialized`. Fails only when the store cannot
    /// be created or opened; playback must still proceed uncached.
    pub async fn initialize(
        options: EngineOptions,
        fetcher: Arc<dyn SegmentFetcher>,
    ) -> Result<Arc<Self>> {
        options.config.validate()?;
        let store: SegmentStoreRef = Arc::new(
            DiskStore::open(&options.cache_dir, options.config.max_cache_size).await?,
        );
        Self::with_store(options, store, fetcher)
    }

    /// Initialize the engine over an existing store backend
    pub fn with_store(
        options: EngineOptions,
        store: SegmentStoreRef,
        fetcher: Arc<dyn SegmentFetcher>,
    ) -> Result<Arc<Self>> {
        options.config.validate()?;

        let (event_tx, _) = broadcast::channel(options.event_channel_capacity);
        let metrics = Arc::new(CacheMetrics::new());
        let maintenance =
            MaintenanceRunner::new(store.clone(), metrics.clone(), options.max_entry_age);
        let base_config = options.config;

        let engine = Arc::new(Self {
            usage_history: UsageHistory::with_capacity(options.usage_history_capacity),
            options,
            base_config,
            active_config: RwLock::new(Arc::new(base_config)),
            active_strategy: RwLock::new(CacheStrategy::Normal),
            store,
            fetcher,
            metrics,
            maintenance,
            preload_tasks: DashMap::new(),
            event_tx,
            shutdown: CancellationToken::new(),
            monitor: Mutex::new(None),
            cleaned: AtomicBool::new(false),
        });

        *engine.monitor.lock() = Some(Self::spawn_monitor(&engine));

        engine.emit(EngineEvent::Initialized {
            max_cache_size: base_config.max_cache_size,
            preload_duration_ms: base_config.preload_duration.as_millis() as u64,
        });
        info!(
            max_cache_size = base_config.max_cache_size,
            "Cache engine initialized"
        );

        Ok(engine)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribe to engine events
    ///
    /// Late subscribers only see events from their join point forward.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    // =========================================================================
    // Configuration & Strategy
    // =========================================================================

    /// Currently active configuration
    pub fn active_config(&self) -> Arc<CacheConfig> {
        self.active_config.read().clone()
    }

    /// Base configuration supplied at initialization
    pub fn base_config(&self) -> CacheConfig {
        self.base_config
    }

    /// Strategy currently in effect
    pub fn active_strategy(&self) -> CacheStrategy {
        *self.active_strategy.read()
    }

    /// Apply a configuration, replacing the active one atomically
    ///
    /// Always emits `ConfigurationApplied`. When the new capacity is below
    /// the current store size, LRU entries are evicted down to the bound
    /// immediately.
    pub async fn apply_configuration(&self, config: CacheConfig) {
        *self.active_config.write() = Arc::new(config);

        let before = self.store.size_bytes();
        match self.store.set_capacity(config.max_cache_size).await {
            Ok(evicted) if evicted > 0 => {
                let freed = before.saturating_sub(self.store.size_bytes());
                self.metrics.record_evictions(evicted, freed);
                debug!(evicted, freed, "Shrunk cache for new configuration");
            }
            Ok(_) => {}
            Err(e) => self.emit(EngineEvent::error("apply_configuration", e)),
        }

        self.emit(EngineEvent::ConfigurationApplied {
            max_cache_size: config.max_cache_size,
            preload_duration_ms: config.preload_duration.as_millis() as u64,
        });
    }

    async fn apply_plan(&self, plan: &StrategyPlan) {
        *self.active_strategy.write() = plan.strategy;
        self.apply_configuration(plan.config).await;
    }

    /// Derive and apply a configuration for a strategy
    ///
    /// Returns a human-readable description for telemetry; never fails for
    /// valid strategy values.
    pub async fn optimize_cache(&self, strategy: CacheStrategy, content: &ContentInfo) -> String {
        let plan = strategy::plan(strategy, self.base_config, content);
        self.apply_plan(&plan).await;
        self.emit(EngineEvent::StrategyChanged {
            strategy,
            description: plan.description.clone(),
        });
        info!(%strategy, "Cache strategy applied");
        plan.description
    }

    /// React to a performance analysis
    ///
    /// Recognized reasons map to canned strategy responses; unrecognized
    /// reasons are a no-op. Derivations key off the base config, not the
    /// currently applied one.
    pub async fn adjust_cache(&self, analysis: &str) -> String {
        match strategy::categorize_adjustment(analysis) {
            Some(strategy) => {
                let plan = strategy::plan(strategy, self.base_config, &ContentInfo::default());
                self.apply_plan(&plan).await;
                self.emit(EngineEvent::ConfigurationChanged {
                    strategy,
                    description: plan.description.clone(),
                });
                info!(%strategy, analysis, "Cache adjusted");
                plan.description
            }
            None => "no adjustment needed".to_string(),
        }
    }

    /// Double capacity and triple preload for offline viewing
    pub async fn enable_offline_mode(&self) {
        let config = CacheConfig::new(
            self.base_config.max_cache_size * 2,
            self.base_config.preload_duration * 3,
        );
        self.apply_configuration(config).await;
        self.emit(EngineEvent::ModeChanged {
            mode: "offline".to_string(),
        });
    }

    /// Restore the base configuration
    pub async fn set_normal_mode(&self) {
        *self.active_strategy.write() = CacheStrategy::Normal;
        self.apply_configuration(self.base_config).await;
        self.emit(EngineEvent::ModeChanged {
            mode: "normal".to_string(),
        });
    }

    /// Double preload only, for high-quality startup
    pub async fn enable_high_quality_mode(&self) {
        let config = self
            .base_config
            .with_preload_duration(self.base_config.preload_duration * 2);
        self.apply_configuration(config).await;
        self.emit(EngineEvent::ModeChanged {
            mode: "high-quality".to_string(),
        });
    }

    // =========================================================================
    // Preload
    // =========================================================================

    /// Whether `additional` bytes fit under the active capacity limit
    pub fn has_available_space(&self, additional: u64) -> bool {
        self.store.size_bytes() + additional <= self.active_config().max_cache_size
    }

    /// Preload the opening portion of a content item
    ///
    /// Partitions `preload_amount` into 1 MiB segments and fills them
    /// ahead of playback. Stops early (not an error) once the store is
    /// full and returns the partial count. A second request for the same
    /// URI cancels the prior task and takes over the URI's event stream.
    /// On a fetch or store fault the task is marked Failed, an `Error`
    /// event is emitted, and 0 is returned.
    pub async fn preload_initial_segments(&self, uri: &str, preload_amount: u64) -> u32 {
        let total = segment_count(preload_amount);
        if total == 0 {
            return 0;
        }

        let task = PreloadTask::new(uri, preload_amount);
        let task_id = task.id;
        let token = task.cancel.clone();
        if let Some(prev) = self.preload_tasks.insert(uri.to_string(), task) {
            if !prev.status.is_terminal() {
                prev.cancel.cancel();
                debug!(uri, "Superseded in-flight preload task");
            }
        }

        let mut done: u32 = 0;
        let mut completed_bytes: u64 = 0;

        for i in 0..total {
            if token.is_cancelled() {
                self.finish_task(uri, task_id, PreloadStatus::Cancelled, completed_bytes);
                return done;
            }

            let offset = i as u64 * SEGMENT_SIZE;
            let len = SEGMENT_SIZE.min(preload_amount - offset);

            if !self.has_available_space(len) {
                debug!(uri, done, "Preload stopped early: store full");
                break;
            }

            let bytes = match self.fetcher.fetch(uri, offset, len).await {
                Ok(b) => b,
                Err(e) => {
                    self.finish_task(uri, task_id, PreloadStatus::Failed, completed_bytes);
                    self.emit(EngineEvent::error("preload", e));
                    return 0;
                }
            };

            match self.store.put(SegmentKey::new(uri, i), bytes).await {
                Ok(receipt) => {
                    self.metrics.record_write(receipt.written_bytes);
                    self.metrics
                        .record_evictions(receipt.evicted_entries, receipt.evicted_bytes);
                    done += 1;
                    completed_bytes += receipt.written_bytes;
                    self.update_task_progress(uri, task_id, completed_bytes);
                    self.emit(EngineEvent::progress(uri, done as f64 / total as f64));
                }
                Err(e) => {
                    self.finish_task(uri, task_id, PreloadStatus::Failed, completed_bytes);
                    self.emit(EngineEvent::error("preload", e));
                    return 0;
                }
            }
        }

        self.finish_task(uri, task_id, PreloadStatus::Completed, completed_bytes);
        self.emit(EngineEvent::PreloadCompleted {
            uri: uri.to_string(),
            segments: done,
        });
        debug!(uri, segments = done, "Preload finished");
        done
    }

    fn update_task_progress(&self, uri: &str, task_id: u64, completed_bytes: u64) {
        if let Some(mut task) = self.preload_tasks.get_mut(uri) {
            if task.id == task_id {
                task.completed_amount = completed_bytes;
            }
        }
    }

    fn finish_task(&self, uri: &str, task_id: u64, status: PreloadStatus, completed_bytes: u64) {
        if let Some(mut task) = self.preload_tasks.get_mut(uri) {
            if task.id == task_id {
                task.status = status;
                task.completed_amount = completed_bytes;
            }
        }
    }

    /// Current task record for a URI, if any
    pub fn preload_task(&self, uri: &str) -> Option<PreloadTask> {
        self.preload_tasks.get(uri).map(|t| t.value().clone())
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Look up one cached segment
    ///
    /// Records a read request (and a hit on success) and refreshes the
    /// entry's recency. Store faults surface as an `Error` event and
    /// `None`.
    pub async fn read_segment(&self, uri: &str, index: u32) -> Option<Bytes> {
        match self.store.get(&SegmentKey::new(uri, index)).await {
            Ok(Some(bytes)) => {
                self.metrics.record_hit();
                Some(bytes)
            }
            Ok(None) => {
                self.metrics.record_miss();
                None
            }
            Err(e) => {
                self.metrics.record_miss();
                self.emit(EngineEvent::error("read_segment", e));
                None
            }
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Hit ratio in [0,1]
    pub fn cache_hit_ratio(&self) -> f64 {
        self.metrics.hit_ratio()
    }

    /// On-demand statistics from live state
    pub fn statistics(&self) -> CacheStatistics {
        let current_size = self.store.size_bytes();
        let config = self.active_config();
        let snapshot = self.metrics.snapshot();

        let usage_percent = if config.max_cache_size == 0 {
            0.0
        } else {
            current_size as f64 / config.max_cache_size as f64 * 100.0
        };

        let storage_efficiency = if snapshot.total_bytes_written == 0 {
            1.0
        } else {
            current_size as f64 / snapshot.total_bytes_written as f64
        };

        CacheStatistics {
            current_size,
            max_cache_size: config.max_cache_size,
            usage_percent,
            active_preloads: self
                .preload_tasks
                .iter()
                .filter(|t| t.status == PreloadStatus::InProgress)
                .count(),
            metrics: snapshot,
            storage_efficiency,
        }
    }

    /// On-demand health from live metrics
    pub fn health(&self) -> CacheHealth {
        let config = self.active_config();
        compute_health(
            &self.metrics.snapshot(),
            self.store.size_bytes(),
            config.max_cache_size,
        )
    }

    /// Retained usage samples, oldest first
    pub fn usage_history(&self) -> Vec<CacheUsageEntry> {
        self.usage_history.samples()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Reclaim stale entries and compact store structure
    ///
    /// Returns the reclaimed count. A mid-pass fault keeps partial
    /// progress; the `Error` event precedes `MaintenanceCompleted`
    /// carrying whatever was reclaimed before the fault.
    pub async fn perform_maintenance(&self) -> u64 {
        let report = self.maintenance.run().await;
        if let Some(fault) = &report.fault {
            self.emit(EngineEvent::error("maintenance", fault));
        }
        self.emit(EngineEvent::MaintenanceCompleted {
            reclaimed: report.reclaimed,
        });
        report.reclaimed
    }

    /// Unconditional full wipe
    ///
    /// Removes every key, resets all metrics, clears preload tasks and
    /// usage history. This is the only operation that resets metrics.
    pub async fn clear_cache(&self) -> bool {
        for task in self.preload_tasks.iter() {
            task.cancel.cancel();
        }
        self.preload_tasks.clear();
        self.usage_history.clear();

        match self.store.clear().await {
            Ok(()) => {
                self.metrics.reset();
                self.emit(EngineEvent::CacheCleared);
                info!("Cache cleared");
                true
            }
            Err(e) => {
                self.emit(EngineEvent::error("clear_cache", e));
                false
            }
        }
    }

    // =========================================================================
    // Health Monitor Loop
    // =========================================================================

    fn spawn_monitor(engine: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(engine);
        let token = engine.shutdown.clone();
        let period = engine.options.monitor_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The interval's first tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(engine) = weak.upgrade() else { break };
                        engine.health_tick().await;
                    }
                }
            }
            debug!("Health monitor stopped");
        })
    }

    async fn health_tick(&self) {
        let current_size = self.store.size_bytes();
        let config = self.active_config();

        let usage_percent = if config.max_cache_size == 0 {
            0.0
        } else {
            current_size as f64 / config.max_cache_size as f64 * 100.0
        };

        self.usage_history.push(CacheUsageEntry {
            timestamp: Utc::now(),
            size_bytes: current_size,
            usage_percent,
            strategy: self.active_strategy(),
        });

        let health = compute_health(&self.metrics.snapshot(), current_size, config.max_cache_size);
        self.emit(EngineEvent::HealthUpdate { health });

        let overdue = self.metrics.millis_since_maintenance()
            > self.options.maintenance_interval.as_millis() as u64;
        if usage_percent > 90.0 || overdue {
            debug!(usage_percent, overdue, "Monitor triggering maintenance");
            self.perform_maintenance().await;
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Stop the health monitor and release the store
    ///
    /// Idempotent; safe to call even if initialization partially failed.
    pub async fn cleanup(&self) {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shutdown.cancel();
        let handle = self.monitor.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        if let Err(e) = self.store.release().await {
            warn!(error = %e, "Store release failed during cleanup");
        }
        info!("Cache engine cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preload::{FailingFetcher, SimulatedFetcher};
    use crate::store::MemoryStore;
    use std::time::Duration;
    use tokio::time::timeout;

    const MIB: u64 = 1024 * 1024;

    fn options(max: u64) -> EngineOptions {
        EngineOptions {
            config: CacheConfig::new(max, Duration::from_secs(30)),
            // Long tick so monitor noise stays out of operation tests
            monitor_interval: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    fn engine_with(max: u64) -> Arc<CacheEngine> {
        CacheEngine::with_store(
            options(max),
            Arc::new(MemoryStore::with_capacity(max)),
            Arc::new(SimulatedFetcher::instant()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_optimize_aggressive_full_base_extended_preload() {
        let engine = engine_with(100 * MIB);

        let description = engine
            .optimize_cache(CacheStrategy::Aggressive, &ContentInfo::default())
            .await;

        assert!(description.contains("extended preload"));
        let config = engine.active_config();
        assert_eq!(config.max_cache_size, 100 * MIB);
        assert_eq!(config.preload_duration, Duration::from_secs(60));
        assert_eq!(engine.active_strategy(), CacheStrategy::Aggressive);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_optimize_idempotent() {
        let engine = engine_with(100 * MIB);

        engine
            .optimize_cache(CacheStrategy::Conservative, &ContentInfo::default())
            .await;
        let first = *engine.active_config();
        engine
            .optimize_cache(CacheStrategy::Conservative, &ContentInfo::default())
            .await;
        let second = *engine.active_config();

        assert_eq!(first, second);
        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_preload_full_success() {
        let engine = engine_with(100 * MIB);
        let mut rx = engine.subscribe();

        let count = engine
            .preload_initial_segments("video://a", 10 * MIB)
            .await;
        assert_eq!(count, 10);

        let stats = engine.statistics();
        assert_eq!(stats.current_size, 10 * MIB);
        assert_eq!(stats.metrics.write_requests, 10);

        let task = engine.preload_task("video://a").unwrap();
        assert_eq!(task.status, PreloadStatus::Completed);
        assert_eq!(task.completed_amount, 10 * MIB);

        // Progress is monotonically non-decreasing and ends at exactly 1.0
        let mut last_progress = 0.0;
        let mut completed = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                EngineEvent::PreloadProgress { progress, .. } => {
                    assert!(progress >= last_progress);
                    last_progress = progress;
                }
                EngineEvent::PreloadCompleted { segments, .. } => completed = Some(segments),
                _ => {}
            }
        }
        assert_eq!(last_progress, 1.0);
        assert_eq!(completed, Some(10));

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_preload_stops_early_when_full() {
        // Capacity below the requested amount: preload fills what fits
        let engine = engine_with(3 * MIB);

        let count = engine
            .preload_initial_segments("video://a", 10 * MIB)
            .await;
        assert_eq!(count, 3);

        let task = engine.preload_task("video://a").unwrap();
        assert_eq!(task.status, PreloadStatus::Completed);
        assert!(engine.statistics().current_size <= 3 * MIB);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_preload_failure_returns_zero() {
        let engine = CacheEngine::with_store(
            options(100 * MIB),
            Arc::new(MemoryStore::with_capacity(100 * MIB)),
            Arc::new(FailingFetcher),
        )
        .unwrap();
        let mut rx = engine.subscribe();

        let count = engine.preload_initial_segments("video://a", 5 * MIB).await;
        assert_eq!(count, 0);

        let task = engine.preload_task("video://a").unwrap();
        assert_eq!(task.status, PreloadStatus::Failed);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if event.is_error() {
                saw_error = true;
            }
        }
        assert!(saw_error);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_preload_overwrite_cancels_prior() {
        let engine = CacheEngine::with_store(
            EngineOptions {
                config: CacheConfig::new(200 * MIB, Duration::from_secs(30)),
                monitor_interval: Duration::from_secs(3600),
                ..Default::default()
            },
            Arc::new(MemoryStore::with_capacity(200 * MIB)),
            Arc::new(SimulatedFetcher::with_pacing(Duration::from_millis(10))),
        )
        .unwrap();

        let slow = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.preload_initial_segments("video://a", 100 * MIB).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The second request supersedes the in-flight task
        let second = engine.preload_initial_segments("video://a", 2 * MIB).await;
        assert_eq!(second, 2);

        let first = slow.await.unwrap();
        assert!(first < 100);

        let task = engine.preload_task("video://a").unwrap();
        assert_eq!(task.status, PreloadStatus::Completed);
        assert_eq!(task.target_amount, 2 * MIB);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_read_segment_hit_and_miss() {
        let engine = engine_with(100 * MIB);

        engine.preload_initial_segments("video://a", 2 * MIB).await;

        assert!(engine.read_segment("video://a", 0).await.is_some());
        assert!(engine.read_segment("video://a", 5).await.is_none());

        let snapshot = engine.statistics().metrics;
        assert_eq!(snapshot.read_requests, 2);
        assert_eq!(snapshot.cache_hits, 1);

        // hits / (reads + writes) = 1 / (2 + 2)
        assert!((engine.cache_hit_ratio() - 0.25).abs() < 1e-9);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_adjust_keys_off_base_config() {
        let engine = engine_with(100 * MIB);

        let first = engine.adjust_cache("network degraded").await;
        assert!(first.contains("aggressive"));
        assert_eq!(engine.active_config().max_cache_size, 100 * MIB);

        // Conservative derives from the original base, not the adjusted value
        let second = engine.adjust_cache("storage low").await;
        assert!(second.contains("conservative"));
        assert_eq!(engine.active_config().max_cache_size, 50 * MIB);

        assert_eq!(
            engine.adjust_cache("all good here").await,
            "no adjustment needed"
        );

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_mode_presets() {
        let engine = engine_with(100 * MIB);

        engine.enable_offline_mode().await;
        let config = engine.active_config();
        assert_eq!(config.max_cache_size, 200 * MIB);
        assert_eq!(config.preload_duration, Duration::from_secs(90));

        engine.enable_high_quality_mode().await;
        let config = engine.active_config();
        assert_eq!(config.max_cache_size, 100 * MIB);
        assert_eq!(config.preload_duration, Duration::from_secs(60));

        engine.set_normal_mode().await;
        assert_eq!(*engine.active_config(), engine.base_config());

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_shrinking_config_evicts_down() {
        let engine = engine_with(10 * MIB);

        engine.preload_initial_segments("video://a", 8 * MIB).await;
        assert_eq!(engine.statistics().current_size, 8 * MIB);

        engine
            .apply_configuration(CacheConfig::new(4 * MIB, Duration::from_secs(30)))
            .await;

        let stats = engine.statistics();
        assert!(stats.current_size <= 4 * MIB);
        assert!(stats.metrics.evictions > 0);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let engine = engine_with(100 * MIB);

        engine.preload_initial_segments("video://a", 5 * MIB).await;
        engine.read_segment("video://a", 0).await;
        engine.perform_maintenance().await;

        assert!(engine.clear_cache().await);

        let stats = engine.statistics();
        assert_eq!(stats.current_size, 0);
        assert_eq!(stats.metrics.read_requests, 0);
        assert_eq!(stats.metrics.write_requests, 0);
        assert_eq!(stats.metrics.cache_hits, 0);
        assert_eq!(stats.metrics.evictions, 0);
        assert_eq!(stats.metrics.total_bytes_written, 0);
        assert_eq!(stats.metrics.maintenance_count, 0);
        assert_eq!(engine.cache_hit_ratio(), 0.0);
        assert!(engine.usage_history().is_empty());
        assert_eq!(stats.active_preloads, 0);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_statistics_efficiency_defaults() {
        let engine = engine_with(100 * MIB);

        // No writes yet: efficiency is defined as 1.0
        assert_eq!(engine.statistics().storage_efficiency, 1.0);

        engine.preload_initial_segments("video://a", 2 * MIB).await;
        let stats = engine.statistics();
        assert!((stats.storage_efficiency - 1.0).abs() < 1e-9);

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_health_score_bounds() {
        let engine = engine_with(100 * MIB);

        let health = engine.health();
        assert!((0.0..=1.0).contains(&health.score));

        engine.preload_initial_segments("video://a", 50 * MIB).await;
        for i in 0..20 {
            engine.read_segment("video://a", i % 60).await;
        }

        let health = engine.health();
        assert!((0.0..=1.0).contains(&health.score));

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_monitor_emits_health_updates() {
        let engine = CacheEngine::with_store(
            EngineOptions {
                config: CacheConfig::new(10 * MIB, Duration::from_secs(30)),
                monitor_interval: Duration::from_millis(50),
                ..Default::default()
            },
            Arc::new(MemoryStore::with_capacity(10 * MIB)),
            Arc::new(SimulatedFetcher::instant()),
        )
        .unwrap();
        let mut rx = engine.subscribe();

        let mut saw_health = false;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            match timeout(Duration::from_millis(500), rx.recv()).await {
                Ok(Ok(EngineEvent::HealthUpdate { health })) => {
                    assert!((0.0..=1.0).contains(&health.score));
                    saw_health = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_health);
        assert!(!engine.usage_history().is_empty());

        engine.cleanup().await;
    }

    #[tokio::test]
    async fn test_cleanup_idempotent_and_stops_monitor() {
        let engine = CacheEngine::with_store(
            EngineOptions {
                config: CacheConfig::new(10 * MIB, Duration::from_secs(30)),
                monitor_interval: Duration::from_millis(20),
                ..Default::default()
            },
            Arc::new(MemoryStore::with_capacity(10 * MIB)),
            Arc::new(SimulatedFetcher::instant()),
        )
        .unwrap();

        engine.cleanup().await;
        engine.cleanup().await;

        // The monitor is gone: no further samples accumulate
        let before = engine.usage_history().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.usage_history().len(), before);
    }

    #[tokio::test]
    async fn test_initialize_on_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = CacheEngine::initialize(
            EngineOptions {
                cache_dir: tmp.path().to_path_buf(),
                config: CacheConfig::new(10 * MIB, Duration::from_secs(30)),
                monitor_interval: Duration::from_secs(3600),
                ..Default::default()
            },
            Arc::new(SimulatedFetcher::instant()),
        )
        .await
        .unwrap();

        let count = engine.preload_initial_segments("video://a", 2 * MIB).await;
        assert_eq!(count, 2);
        assert!(engine.read_segment("video://a", 1).await.is_some());

        engine.cleanup().await;
    }
}
