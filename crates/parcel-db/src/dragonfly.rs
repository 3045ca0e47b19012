//! `Dragonfly` (Redis-compatible) claimant record store.
//!
//! Each claimant record is one JSON document under its own key.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `claimant:actor:{id}` | JSON | Actor [`ClaimantPayload`] |
//! | `claimant:group:{id}` | JSON | Group [`ClaimantPayload`] |

use fred::prelude::*;
use parcel_registry::{OwnerStore, StoreError};
use parcel_types::{ClaimantKey, ClaimantPayload};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DbError;

/// Key holding the record stored under `key`.
fn record_key(key: ClaimantKey) -> String {
    format!("claimant:{key}")
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and implements [`OwnerStore`] over the
/// key patterns above.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize it from JSON.
    ///
    /// A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(DbError::from)
    }

    /// Delete the value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete_key(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    // =========================================================================
    // Claimant records
    // =========================================================================

    /// Read the claimant record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or decode fails.
    pub async fn get_claimant(&self, key: ClaimantKey) -> Result<Option<ClaimantPayload>, DbError> {
        self.get_json(&record_key(key)).await
    }

    /// Store `payload` under its own key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the encode or the write fails.
    pub async fn set_claimant(&self, payload: &ClaimantPayload) -> Result<(), DbError> {
        self.set_json(&record_key(payload.key()), payload).await
    }

    /// Remove the claimant record under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete_claimant(&self, key: ClaimantKey) -> Result<(), DbError> {
        self.delete_key(&record_key(key)).await
    }
}

impl OwnerStore for DragonflyPool {
    async fn load(&self, key: ClaimantKey) -> Result<Option<ClaimantPayload>, StoreError> {
        Ok(self.get_claimant(key).await?)
    }

    async fn save(&self, payload: &ClaimantPayload) -> Result<(), StoreError> {
        Ok(self.set_claimant(payload).await?)
    }

    async fn delete(&self, key: ClaimantKey) -> Result<(), StoreError> {
        Ok(self.delete_claimant(key).await?)
    }
}
