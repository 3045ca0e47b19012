//! Persistent storage seam for claimant payloads.
//!
//! The registry only decides *what* is stored and *when*. A store maps a
//! [`ClaimantKey`] to an opaque [`ClaimantPayload`]; the byte encoding is
//! the implementation's concern (`parcel-db` ships a Dragonfly-backed one).
//! [`MemoryOwnerStore`] is a process-local implementation with failure
//! injection for tests and embedders.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use parcel_types::{ClaimantKey, ClaimantPayload};

use crate::error::StoreError;

/// A persistent key-value store of claimant payloads.
pub trait OwnerStore: Send + Sync + 'static {
    /// Fetch the payload stored under `key`, if any.
    fn load(
        &self,
        key: ClaimantKey,
    ) -> impl Future<Output = Result<Option<ClaimantPayload>, StoreError>> + Send;

    /// Store `payload` under its own key, replacing any previous value.
    fn save(&self, payload: &ClaimantPayload) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the payload stored under `key`. Missing keys are not an error.
    fn delete(&self, key: ClaimantKey) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory [`OwnerStore`].
#[derive(Debug, Default)]
pub struct MemoryOwnerStore {
    records: Mutex<BTreeMap<ClaimantKey, ClaimantPayload>>,
    fail_saves: AtomicBool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryOwnerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` under an arbitrary key, bypassing identity checks.
    ///
    /// Lets tests plant a payload under the wrong key.
    pub fn insert_raw(&self, key: ClaimantKey, payload: ClaimantPayload) {
        self.records().insert(key, payload);
    }

    /// The payload currently stored under `key`.
    pub fn get(&self, key: ClaimantKey) -> Option<ClaimantPayload> {
        self.records().get(&key).cloned()
    }

    /// Whether anything is stored under `key`.
    pub fn contains(&self, key: ClaimantKey) -> bool {
        self.records().contains_key(&key)
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Release);
    }

    /// Number of `load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Acquire)
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<ClaimantKey, ClaimantPayload>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OwnerStore for MemoryOwnerStore {
    async fn load(&self, key: ClaimantKey) -> Result<Option<ClaimantPayload>, StoreError> {
        self.loads.fetch_add(1, Ordering::AcqRel);
        // Yield so concurrent lookups interleave the way they would over I/O.
        tokio::task::yield_now().await;
        Ok(self.get(key))
    }

    async fn save(&self, payload: &ClaimantPayload) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        if self.fail_saves.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable(String::from("saves disabled")));
        }
        self.records().insert(payload.key(), payload.clone());
        self.saves.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn delete(&self, key: ClaimantKey) -> Result<(), StoreError> {
        self.records().remove(&key);
        Ok(())
    }
}
