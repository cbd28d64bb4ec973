//! Error types for the record store.
//!
//! All errors are propagated via [`StoreError`], which wraps the underlying
//! I/O and JSON errors with the world whose record was being accessed.

use fallow_types::WorldId;

/// Errors that can occur while loading or saving session records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on record for world {world}: {source}")]
    Io {
        /// World whose record was being accessed.
        world: WorldId,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The data directory could not be prepared.
    #[error("cannot prepare data directory {path}: {source}")]
    DataDir {
        /// Directory that was being created.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A record document is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("record store lock poisoned")]
    Poisoned,
}
