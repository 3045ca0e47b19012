//! Grid cell coordinates.
//!
//! The world is an infinite plane per dimension, partitioned into square
//! cells of [`CELL_SIZE`] world units. A [`CellTag`] names one cell and is
//! the atomic unit of ownership.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{ActorId, GroupId};

/// Edge length of one cell in world units.
pub const CELL_SIZE: i64 = 16;

/// Largest in-cell offset: a cell spans `start..=start + CELL_MAX_OFFSET`.
pub const CELL_MAX_OFFSET: i64 = 15;

/// Opaque identifier of an independent plane of the grid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DimensionId(pub String);

impl DimensionId {
    /// Create a dimension identifier from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DimensionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DimensionId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for DimensionId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Immutable `(dimension, x, z)` cell coordinate.
///
/// Ordering is dimension first, then row-major (`z`, then `x`), which is
/// the order the outline engine consumes cells in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellTag {
    /// The plane this cell lives in.
    pub dimension: DimensionId,
    /// Cell column.
    pub x: i32,
    /// Cell row.
    pub z: i32,
}

impl CellTag {
    /// Create a cell coordinate.
    pub fn new(dimension: impl Into<DimensionId>, x: i32, z: i32) -> Self {
        Self {
            dimension: dimension.into(),
            x,
            z,
        }
    }

    /// The cell containing world position `(block_x, block_z)`.
    pub fn containing(dimension: impl Into<DimensionId>, block_x: i64, block_z: i64) -> Self {
        Self::new(dimension, cell_index(block_x), cell_index(block_z))
    }

    /// Smallest world coordinate inside the cell.
    pub fn start(&self) -> (i64, i64) {
        (
            i64::from(self.x).saturating_mul(CELL_SIZE),
            i64::from(self.z).saturating_mul(CELL_SIZE),
        )
    }

    /// Largest world coordinate inside the cell (`start + 15`).
    pub fn end(&self) -> (i64, i64) {
        let (x, z) = self.start();
        (
            x.saturating_add(CELL_MAX_OFFSET),
            z.saturating_add(CELL_MAX_OFFSET),
        )
    }

    /// The cell offset by `(dx, dz)` in the same dimension.
    ///
    /// Returns `None` if the offset leaves the `i32` grid.
    pub fn offset(&self, dx: i32, dz: i32) -> Option<Self> {
        Some(Self {
            dimension: self.dimension.clone(),
            x: self.x.checked_add(dx)?,
            z: self.z.checked_add(dz)?,
        })
    }
}

impl PartialOrd for CellTag {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellTag {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.dimension
            .cmp(&other.dimension)
            .then(self.z.cmp(&other.z))
            .then(self.x.cmp(&other.x))
    }
}

impl core::fmt::Display for CellTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@({}, {})", self.dimension, self.x, self.z)
    }
}

/// Cell index containing a world coordinate, saturating at the `i32` grid edge.
fn cell_index(block: i64) -> i32 {
    let index = block.div_euclid(CELL_SIZE);
    i32::try_from(index).unwrap_or(if index < 0 { i32::MIN } else { i32::MAX })
}

/// Persisted ownership pair for one cell.
///
/// The row is keyed by its own `cell`; a row returned for a different
/// coordinate than the one requested is corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOwnership {
    /// The cell this row describes.
    pub cell: CellTag,
    /// The actor who claimed the cell.
    pub actor_owner: Option<ActorId>,
    /// The group the cell is attributed to, if stored explicitly.
    pub group_owner: Option<GroupId>,
}

impl CellOwnership {
    /// An unclaimed row for `cell`.
    pub const fn unclaimed(cell: CellTag) -> Self {
        Self {
            cell,
            actor_owner: None,
            group_owner: None,
        }
    }

    /// Whether neither owner is set.
    pub const fn is_unclaimed(&self) -> bool {
        self.actor_owner.is_none() && self.group_owner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_end_span_sixteen_units() {
        let cell = CellTag::new("overworld", 2, -3);
        assert_eq!(cell.start(), (32, -48));
        assert_eq!(cell.end(), (47, -33));
    }

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(CellTag::containing("overworld", -1, 0), CellTag::new("overworld", -1, 0));
        assert_eq!(CellTag::containing("overworld", -16, 15), CellTag::new("overworld", -1, 0));
        assert_eq!(CellTag::containing("overworld", -17, 16), CellTag::new("overworld", -2, 1));
    }

    #[test]
    fn equality_includes_dimension() {
        assert_ne!(CellTag::new("overworld", 0, 0), CellTag::new("nether", 0, 0));
    }

    #[test]
    fn ordering_is_row_major_within_a_dimension() {
        let mut cells = vec![
            CellTag::new("a", 1, 1),
            CellTag::new("a", 0, 1),
            CellTag::new("a", 5, 0),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                CellTag::new("a", 5, 0),
                CellTag::new("a", 0, 1),
                CellTag::new("a", 1, 1),
            ]
        );
    }

    #[test]
    fn offset_rejects_grid_overflow() {
        assert!(CellTag::new("a", i32::MAX, 0).offset(1, 0).is_none());
        assert_eq!(
            CellTag::new("a", 0, 0).offset(-1, 1),
            Some(CellTag::new("a", -1, 1))
        );
    }
}
