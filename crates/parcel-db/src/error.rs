//! Error types for the data layer.
//!
//! Every adapter method returns [`DbError`]. At the store seams the error is
//! folded into the registry's [`StoreError`]: undecodable data becomes
//! [`StoreError::Corrupt`], everything else [`StoreError::Unavailable`].

use parcel_registry::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds values no cell can have.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Serialization(_) | DbError::InvalidRow(_) => Self::Corrupt(err.to_string()),
            DbError::Postgres(_)
            | DbError::Migration(_)
            | DbError::Dragonfly(_)
            | DbError::Config(_) => Self::Unavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_map_to_corrupt() {
        let err = DbError::InvalidRow(String::from("cell 0,0 has no owner"));
        assert!(matches!(StoreError::from(err), StoreError::Corrupt(_)));
    }

    #[test]
    fn connection_failures_map_to_unavailable() {
        let err = DbError::Config(String::from("bad url"));
        assert!(matches!(StoreError::from(err), StoreError::Unavailable(_)));
    }
}
