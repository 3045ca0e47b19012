//! Per-corner vertex classification.
//!
//! A corner of an owned cell is an outline vertex depending only on the
//! 2x2 block of cells that meet there: the cell itself, its two side
//! neighbours through that corner and the diagonal one. This gives a
//! local answer that must agree with the traced rings.

use std::collections::BTreeSet;

use parcel_types::Point;

use crate::grid::{GridPos, Heading};

/// One of the four corners of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// Low `x`, low `z`.
    SouthWest,
    /// High `x`, low `z`.
    SouthEast,
    /// Low `x`, high `z`.
    NorthWest,
    /// High `x`, high `z`.
    NorthEast,
}

impl Corner {
    /// All four corners.
    pub const ALL: [Self; 4] = [
        Self::SouthWest,
        Self::SouthEast,
        Self::NorthWest,
        Self::NorthEast,
    ];

    const fn headings(self) -> (Heading, Heading) {
        match self {
            Self::SouthWest => (Heading::West, Heading::South),
            Self::SouthEast => (Heading::East, Heading::South),
            Self::NorthWest => (Heading::West, Heading::North),
            Self::NorthEast => (Heading::East, Heading::North),
        }
    }

    /// The corner's position in world units.
    pub fn point(self, cell: GridPos) -> Point {
        match self {
            Self::SouthWest => cell.corner(false, false),
            Self::SouthEast => cell.corner(true, false),
            Self::NorthWest => cell.corner(false, true),
            Self::NorthEast => cell.corner(true, true),
        }
    }
}

/// Shape of the boundary at a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CornerKind {
    /// One of the four cells is owned.
    Convex,
    /// Three of the four cells are owned.
    Concave,
    /// Two diagonally opposite cells are owned.
    Pinch,
}

/// Classify `corner` of the owned `cell`.
///
/// `None` when the corner lies on a straight stretch of boundary or inside
/// the owned area.
pub fn classify(cells: &BTreeSet<GridPos>, cell: GridPos, corner: Corner) -> Option<CornerKind> {
    let owned = |pos: Option<GridPos>| pos.is_some_and(|p| cells.contains(&p));
    let (along_x, along_z) = corner.headings();

    let side_x = owned(cell.step(along_x));
    let side_z = owned(cell.step(along_z));
    let diagonal = owned(cell.step2(along_x, along_z));

    match (side_x, side_z, diagonal) {
        (false, false, false) => Some(CornerKind::Convex),
        (false, false, true) => Some(CornerKind::Pinch),
        (true, true, false) | (true, false, true) | (false, true, true) => {
            Some(CornerKind::Concave)
        }
        (true, false, false) | (false, true, false) | (true, true, true) => None,
    }
}

/// Every vertex of a cell set, found corner by corner.
pub fn vertices(cells: &BTreeSet<GridPos>) -> BTreeSet<Point> {
    cells
        .iter()
        .flat_map(|&cell| {
            Corner::ALL
                .into_iter()
                .filter(move |&corner| classify(cells, cell, corner).is_some())
                .map(move |corner| corner.point(cell))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(list: &[(i32, i32)]) -> BTreeSet<GridPos> {
        list.iter().map(|&(x, z)| GridPos::new(x, z)).collect()
    }

    #[test]
    fn lone_cell_has_four_convex_corners() {
        let set = cells(&[(0, 0)]);
        for corner in Corner::ALL {
            assert_eq!(
                classify(&set, GridPos::new(0, 0), corner),
                Some(CornerKind::Convex)
            );
        }
    }

    #[test]
    fn shared_edge_corners_are_not_vertices() {
        let set = cells(&[(0, 0), (1, 0)]);
        assert_eq!(classify(&set, GridPos::new(0, 0), Corner::NorthEast), None);
        assert_eq!(vertices(&set).len(), 4);
    }

    #[test]
    fn inner_corner_of_l_is_concave() {
        let set = cells(&[(0, 0), (1, 0), (0, 1)]);
        assert_eq!(
            classify(&set, GridPos::new(0, 0), Corner::NorthEast),
            Some(CornerKind::Concave)
        );
        assert_eq!(
            classify(&set, GridPos::new(1, 0), Corner::NorthWest),
            Some(CornerKind::Concave)
        );
        assert_eq!(vertices(&set).len(), 6);
    }

    #[test]
    fn diagonal_pair_shares_a_pinch_vertex() {
        let set = cells(&[(0, 0), (1, 1)]);
        assert_eq!(
            classify(&set, GridPos::new(0, 0), Corner::NorthEast),
            Some(CornerKind::Pinch)
        );
        assert!(vertices(&set).contains(&Point::new(16, 16)));
        assert_eq!(vertices(&set).len(), 7);
    }

    #[test]
    fn interior_corner_of_block_is_not_a_vertex() {
        let set = cells(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(classify(&set, GridPos::new(0, 0), Corner::NorthEast), None);
        assert_eq!(
            vertices(&set),
            BTreeSet::from([
                Point::new(0, 0),
                Point::new(0, 32),
                Point::new(32, 32),
                Point::new(32, 0),
            ])
        );
    }
}
