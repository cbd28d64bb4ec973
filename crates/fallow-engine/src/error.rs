//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fallow_core::config::ConfigError,
    },

    /// Demo world construction failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: fallow_world::WorldError,
    },

    /// The record store could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: fallow_store::StoreError,
    },

    /// The tick loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: fallow_core::runner::RunnerError,
    },

    /// `engine.world_id` is not a UUID.
    #[error("invalid engine.world_id {value:?}: {source}")]
    WorldId {
        /// The configured value.
        value: String,
        /// The parse failure.
        source: uuid::Error,
    },
}
