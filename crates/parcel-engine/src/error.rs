//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps one startup or shutdown step so `main` can propagate
/// with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: parcel_core::ConfigError,
    },

    /// A database connection or migration failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying data layer error.
        #[from]
        source: parcel_db::DbError,
    },

    /// Installing the shutdown signal handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The maintenance task panicked or was cancelled.
    #[error("maintenance task failed: {source}")]
    Maintenance {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
