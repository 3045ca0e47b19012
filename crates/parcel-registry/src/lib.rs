//! Claimant records and the process-wide registry cache.
//!
//! Every actor and group is represented by exactly one live record per
//! process. Records are loaded lazily from an [`OwnerStore`], mutated in
//! place through [`Claimant`] handles, and written back by
//! [`RegistryCache::flush_dirty`]. A record stays pinned in memory while it
//! has unsaved changes, even after every handle has been dropped.
//!
//! # Modules
//!
//! - [`claimant`] -- [`Claimant`] records and the typed [`Actor`] and
//!   [`Group`] views.
//! - [`registry`] -- [`RegistryCache`], the weak/dirty slot table and the
//!   load state machine.
//! - [`membership`] -- Group lifecycle: create, invite, join, leave,
//!   transfer and delete.
//! - [`store`] -- The [`OwnerStore`] persistence seam and
//!   [`MemoryOwnerStore`].
//! - [`error`] -- [`RegistryError`] and [`StoreError`].

pub mod claimant;
pub mod error;
pub mod membership;
pub mod registry;
pub mod store;

pub use claimant::{Actor, Claimant, Group, LoadState};
pub use error::{RegistryError, StoreError};
pub use registry::{FlushReport, RegistryCache, SweepReport};
pub use store::{MemoryOwnerStore, OwnerStore};
