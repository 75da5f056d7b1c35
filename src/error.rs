//! Application-wide error types.
//!
//! Library modules use the [`Error`] enum via `thiserror`; CLI/main uses
//! `anyhow` for convenient propagation.
//!
//! The split that matters operationally:
//! - [`Error::StoreOpen`] and [`Error::Schema`] are fatal: the index store
//!   is unusable and the whole operation aborts.
//! - Everything that can happen per-file or per-statement during a scan is
//!   logged and degraded inside the scanner; those errors never propagate
//!   out of the reconciliation loop.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing database file could not be opened or created.
    #[error("failed to open index store: {0}")]
    StoreOpen(#[source] sqlx::Error),

    /// The track tables could not be created or dropped. The store must be
    /// treated as unusable until a retry succeeds.
    #[error("schema error: {0}")]
    Schema(#[source] sqlx::Error),

    /// Any other database error (single statement failures are normally
    /// handled locally inside the scan; this surfaces the ones that abort,
    /// like failing to read the pre-scan index).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An artwork file could not be copied into the cache.
    #[error("failed to copy artwork {from} to {to}: {source}")]
    ArtCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
