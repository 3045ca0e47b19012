//! Cell ownership, permission evaluation, and the claim service for Parcel.
//!
//! This crate answers the two questions every gameplay hook asks: who owns
//! this cell, and may this actor act here. It also carries the claim and
//! unclaim operations that keep the cell store and the owners' cell sets
//! in step, and the background task that saves and evicts claimant records.
//!
//! # Modules
//!
//! - [`cell_cache`] -- [`CellOwnershipCache`] over a pluggable [`CellStore`],
//!   with group derivation and a range probe.
//! - [`permission`] -- Pure permission and setting evaluation.
//! - [`service`] -- [`ClaimService`], the facade external collaborators call.
//! - [`maintenance`] -- [`spawn_maintenance`], the periodic save and sweep
//!   task.
//! - [`config`] -- Configuration loading from `parcel-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`CoreError`].
//!
//! [`CellOwnershipCache`]: cell_cache::CellOwnershipCache
//! [`CellStore`]: cell_cache::CellStore
//! [`ClaimService`]: service::ClaimService
//! [`spawn_maintenance`]: maintenance::spawn_maintenance
//! [`CoreError`]: error::CoreError

pub mod cell_cache;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod permission;
pub mod service;

pub use cell_cache::{CellOwnershipCache, CellRange, CellStore, MemoryCellStore};
pub use config::{ConfigError, ParcelConfig};
pub use error::CoreError;
pub use maintenance::spawn_maintenance;
pub use service::{ClaimOutcome, ClaimRefusal, ClaimService};
