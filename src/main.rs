//! Adaptive Media Cache Daemon
//!
//! Standalone runner for the cache engine: opens the on-disk store, starts
//! the health monitor, forwards engine events to the log, and runs until
//! interrupted.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adaptive_media_cache::preload::SimulatedFetcher;
use adaptive_media_cache::{CacheConfig, CacheEngine, EngineEvent, EngineOptions};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Adaptive Media Cache - on-device segment cache daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache directory
    #[arg(long, env = "CACHE_DIR", default_value = "/var/cache/adaptive-media-cache")]
    cache_dir: PathBuf,

    /// Maximum cache size in MiB
    #[arg(long, env = "MAX_CACHE_SIZE_MIB", default_value = "100")]
    max_cache_size_mib: u64,

    /// Preload duration in milliseconds
    #[arg(long, env = "PRELOAD_DURATION_MS", default_value = "30000")]
    preload_duration_ms: u64,

    /// Health monitor interval in seconds
    #[arg(long, env = "MONITOR_INTERVAL", default_value = "60")]
    monitor_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Adaptive Media Cache daemon");
    info!("  Version: {}", adaptive_media_cache::VERSION);
    info!("  Cache dir: {}", args.cache_dir.display());
    info!("  Capacity: {} MiB", args.max_cache_size_mib);

    let options = EngineOptions {
        cache_dir: args.cache_dir.clone(),
        config: CacheConfig::new(
            args.max_cache_size_mib * 1024 * 1024,
            Duration::from_millis(args.preload_duration_ms),
        ),
        monitor_interval: Duration::from_secs(args.monitor_interval_secs),
        ..Default::default()
    };

    let engine = CacheEngine::initialize(options, Arc::new(SimulatedFetcher::instant()))
        .await
        .context("cache engine initialization failed")?;

    // Forward engine events to the log
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                EngineEvent::Error { operation, message } => {
                    warn!(operation = %operation, message = %message, "engine fault");
                }
                EngineEvent::HealthUpdate { health } => {
                    info!(
                        score = health.score,
                        status = %health.status,
                        usage = health.usage_percent,
                        "health update"
                    );
                }
                other => info!(event = ?other, "engine event"),
            }
        }
    });

    info!("Cache engine running; press ctrl-c to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    let stats = engine.statistics();
    info!(
        size = stats.current_size,
        hit_ratio = engine.cache_hit_ratio(),
        "Final cache statistics"
    );
    engine.cleanup().await;

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
