//! Shared type definitions for the Parcel claim system.
//!
//! This crate is the single source of truth for values that cross crate
//! boundaries: identifiers, grid coordinates, ranks and permissions, the
//! persisted payload shapes, and the outline shapes consumed by the
//! external map renderer (exported to `TypeScript` via `ts-rs`).
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers and the registry [`ClaimantKey`]
//! - [`cell`] -- [`CellTag`] grid coordinates and the persisted
//!   [`CellOwnership`] row
//! - [`enums`] -- [`Rank`], [`Permission`], [`Setting`], [`ClaimantKind`]
//! - [`payload`] -- [`ClaimantPayload`] as stored by the claimant store
//! - [`outline`] -- [`Point`], [`Outline`] and [`RegionOutline`]

pub mod cell;
pub mod enums;
pub mod ids;
pub mod outline;
pub mod payload;

// Re-export all public types at crate root for convenience.
pub use cell::{CELL_MAX_OFFSET, CELL_SIZE, CellOwnership, CellTag, DimensionId};
pub use enums::{ClaimantKind, Permission, Rank, Setting};
pub use ids::{ActorId, ClaimantKey, GroupId};
pub use outline::{Outline, Point, RegionOutline};
pub use payload::{ClaimantPayload, MembershipPayload};
