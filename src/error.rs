//! Error types for the cache engine
//!
//! Provides structured error types for the content store, preload scheduler,
//! and maintenance runner. Recoverable faults are caught at operation
//! boundaries and converted into `Error` events; only store initialization
//! failure propagates to the caller.

use thiserror::Error;

/// Unified error type for the cache engine
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Store Errors
    // =========================================================================
    #[error("Store initialization failed: {0}")]
    StoreInit(String),

    #[error("Store operation failed: {0}")]
    StoreOperation(String),

    #[error("Store is closed")]
    StoreClosed,

    // =========================================================================
    // Preload Errors
    // =========================================================================
    #[error("Preload failed for {uri}: {reason}")]
    Preload { uri: String, reason: String },

    // =========================================================================
    // Maintenance Errors
    // =========================================================================
    #[error("Maintenance failed: {0}")]
    Maintenance(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Parse / IO Errors
    // =========================================================================
    #[error("Metadata parse error: {0}")]
    MetadataParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is fatal to cache features
    ///
    /// Store initialization failure means the cache subsystem cannot
    /// function; playback must degrade to direct fetch. Everything else
    /// is recoverable at the operation boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StoreInit(_))
    }

    /// Check if this error indicates a transient store fault
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreOperation(_) | Error::Io(_))
    }
}

/// Result type alias for the cache engine
pub type Result<T> = std::result::Result<T, Error>;
