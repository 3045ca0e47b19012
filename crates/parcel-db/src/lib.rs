//! Data layer for Parcel (`Dragonfly` + `PostgreSQL`).
//!
//! Claimant records are JSON documents in `Dragonfly`; cell ownership rows
//! live in `PostgreSQL`. Each backend implements one of the store seams the
//! caches are generic over.
//!
//! ```text
//! RegistryCache ------ OwnerStore ----> Dragonfly  (DragonflyPool)
//! CellOwnershipCache - CellStore -----> PostgreSQL (PgCellStore)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` claimant record store
//! - [`cell_store`] -- `PostgreSQL` pool, `claimed_cells` rows and the range probe
//! - [`error`] -- Shared error types

pub mod cell_store;
pub mod dragonfly;
pub mod error;

// Re-export primary types for convenience.
pub use cell_store::{CellRow, PgCellStore};
pub use dragonfly::DragonflyPool;
pub use error::DbError;
