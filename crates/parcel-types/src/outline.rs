//! Outline shapes handed to the external map renderer.
//!
//! Outlines are rectilinear polygons in world units. Rings are closed
//! implicitly: the last vertex connects back to the first.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cell::DimensionId;
use crate::ids::ClaimantKey;

/// A vertex in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// World x.
    pub x: i64,
    /// World z.
    pub z: i64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }
}

/// Boundary of one region.
///
/// The exterior ring runs clockwise (x to the right, z up) starting at its
/// lexicographically smallest vertex. Holes run counter-clockwise and are
/// sorted by their first vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Outline {
    /// Outer boundary.
    pub exterior: Vec<Point>,
    /// Enclosed unowned pockets.
    pub holes: Vec<Vec<Point>>,
}

impl Outline {
    /// Total number of vertices across all rings.
    pub fn vertex_count(&self) -> usize {
        self.holes
            .iter()
            .fold(self.exterior.len(), |acc, hole| acc.saturating_add(hole.len()))
    }

    /// Iterate over every ring, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &[Point]> {
        std::iter::once(self.exterior.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }
}

/// Renderer-facing summary of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RegionOutline {
    /// The claimant owning every cell in the region.
    pub owner: ClaimantKey,
    /// The plane the region lives in.
    pub dimension: DimensionId,
    /// Number of cells in the region.
    pub cell_count: u32,
    /// The traced boundary.
    pub outline: Outline,
}
