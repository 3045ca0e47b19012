//! Error types for the `parcel-core` crate.

use parcel_registry::{RegistryError, StoreError};
use parcel_types::CellTag;

/// Errors surfaced by the cell ownership cache and the claim service.
///
/// Permission denials are not errors; they are `false` results.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A claimant lookup or membership operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The cell store could not be reached or returned bad data.
    #[error("cell store: {0}")]
    CellStore(#[from] StoreError),

    /// The cell store returned a row for a different coordinate than the
    /// one requested. The row is rejected and nothing is cached.
    #[error("cell row for {found} returned when loading {expected}")]
    CellMismatch {
        /// The coordinate that was requested.
        expected: CellTag,
        /// The coordinate the row claims to describe.
        found: CellTag,
    },
}
