//! Grid positions and axis headings.
//!
//! Inside one region every cell shares a dimension, so the engine works on
//! bare [`GridPos`] pairs and only re-attaches the dimension on the way out.
//! `North` is `+z` and `East` is `+x`.

use parcel_types::{CELL_SIZE, CellTag, DimensionId, Point};

/// A cell position within a single dimension.
///
/// Ordered row-major (`z`, then `x`), matching [`CellTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    /// Cell column.
    pub x: i32,
    /// Cell row.
    pub z: i32,
}

impl GridPos {
    /// Create a grid position.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Strip the dimension from a cell tag.
    pub const fn of(cell: &CellTag) -> Self {
        Self {
            x: cell.x,
            z: cell.z,
        }
    }

    /// Re-attach a dimension.
    pub fn tag(self, dimension: &DimensionId) -> CellTag {
        CellTag {
            dimension: dimension.clone(),
            x: self.x,
            z: self.z,
        }
    }

    /// The neighbouring position one step along `heading`.
    ///
    /// `None` at the edge of the `i32` grid.
    pub fn step(self, heading: Heading) -> Option<Self> {
        let (dx, dz) = heading.cell_step();
        Some(Self {
            x: self.x.checked_add(dx)?,
            z: self.z.checked_add(dz)?,
        })
    }

    /// The position offset by two headings, typically a diagonal.
    pub fn step2(self, first: Heading, second: Heading) -> Option<Self> {
        self.step(first)?.step(second)
    }

    /// One corner of the cell square in world units.
    pub fn corner(self, east: bool, north: bool) -> Point {
        let x = i64::from(self.x).saturating_mul(CELL_SIZE);
        let z = i64::from(self.z).saturating_mul(CELL_SIZE);
        Point::new(
            if east { x.saturating_add(CELL_SIZE) } else { x },
            if north { z.saturating_add(CELL_SIZE) } else { z },
        )
    }
}

impl PartialOrd for GridPos {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridPos {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.z.cmp(&other.z).then(self.x.cmp(&other.x))
    }
}

/// One of the four axis directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Heading {
    /// `+x`.
    East,
    /// `+z`.
    North,
    /// `-x`.
    West,
    /// `-z`.
    South,
}

impl Heading {
    /// All four headings.
    pub const ALL: [Self; 4] = [Self::East, Self::North, Self::West, Self::South];

    /// Unit vector in world units.
    pub const fn unit(self) -> (i64, i64) {
        match self {
            Self::East => (1, 0),
            Self::North => (0, 1),
            Self::West => (-1, 0),
            Self::South => (0, -1),
        }
    }

    const fn cell_step(self) -> (i32, i32) {
        match self {
            Self::East => (1, 0),
            Self::North => (0, 1),
            Self::West => (-1, 0),
            Self::South => (0, -1),
        }
    }

    /// Clockwise quarter turn.
    pub const fn right(self) -> Self {
        match self {
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
            Self::North => Self::East,
        }
    }

    /// Counter-clockwise quarter turn.
    pub const fn left(self) -> Self {
        match self {
            Self::East => Self::North,
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
        }
    }

    /// The reverse heading.
    pub const fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::West => Self::East,
            Self::North => Self::South,
            Self::South => Self::North,
        }
    }

    /// Whether this heading runs along the x axis.
    pub const fn is_x_axis(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// Heading of the segment `from -> to`.
    ///
    /// `None` for a zero-length or diagonal segment.
    pub fn between(from: Point, to: Point) -> Option<Self> {
        match (to.x.cmp(&from.x), to.z.cmp(&from.z)) {
            (core::cmp::Ordering::Greater, core::cmp::Ordering::Equal) => Some(Self::East),
            (core::cmp::Ordering::Less, core::cmp::Ordering::Equal) => Some(Self::West),
            (core::cmp::Ordering::Equal, core::cmp::Ordering::Greater) => Some(Self::North),
            (core::cmp::Ordering::Equal, core::cmp::Ordering::Less) => Some(Self::South),
            _ => None,
        }
    }

    /// Move `point` by `distance` world units along this heading.
    pub fn advance(self, point: Point, distance: i64) -> Point {
        let (dx, dz) = self.unit();
        Point::new(
            point.x.saturating_add(dx.saturating_mul(distance)),
            point.z.saturating_add(dz.saturating_mul(distance)),
        )
    }
}
