//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and play.

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
        source: waterwars_core::config::ConfigError,
    },

    /// No configuration file was found.
    #[error("config file not found: {path}")]
    MissingConfig {
        /// The path that was tried.
        path: String,
    },

    /// Building the game or running a round failed.
    #[error("round error: {source}")]
    Round {
        /// The underlying round error.
        #[from]
        source: waterwars_core::round::RoundError,
    },

    /// A player task could not be joined.
    #[error("player task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
