//! Contact classification between a candidate cell and a ring edge.
//!
//! Rings run with the owned area on their right, so a candidate outside
//! the region touches an edge only from the left. The candidate's side must
//! lie on the edge line and its span must fit inside the edge span.

use parcel_types::{CELL_SIZE, Outline, Point};

use crate::grid::{GridPos, Heading};

/// How a candidate cell shares one side with a ring edge.
///
/// `Full*` variants name the outward direction of an edge exactly as long
/// as the candidate's side. `End*` variants name the axis the edge runs
/// along and which end of it the candidate sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeContact {
    /// Whole side shared; candidate on the `+x` side of the edge.
    FullUpperX,
    /// Whole side shared; candidate on the `-x` side of the edge.
    FullLowerX,
    /// Whole side shared; candidate on the `+z` side of the edge.
    FullUpperZ,
    /// Whole side shared; candidate on the `-z` side of the edge.
    FullLowerZ,
    /// Edge runs along `x`; candidate at its high-`x` end.
    EndUpperX,
    /// Edge runs along `x`; candidate at its low-`x` end.
    EndLowerX,
    /// Edge runs along `z`; candidate at its high-`z` end.
    EndUpperZ,
    /// Edge runs along `z`; candidate at its low-`z` end.
    EndLowerZ,
}

impl EdgeContact {
    /// Whether the candidate's side covers the whole edge.
    pub const fn is_full(self) -> bool {
        matches!(
            self,
            Self::FullUpperX | Self::FullLowerX | Self::FullUpperZ | Self::FullLowerZ
        )
    }
}

/// Result of testing one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjacency {
    /// One of the eight spliceable contacts.
    Edge(EdgeContact),
    /// The candidate touches the middle of a longer edge.
    MidSpan,
}

/// A contact located on a specific ring edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Ring index: `0` is the exterior, `n` is hole `n - 1`.
    pub ring: usize,
    /// Index of the edge's start vertex within the ring.
    pub edge: usize,
    /// How the candidate touches the edge.
    pub adjacency: Adjacency,
}

/// Classify a candidate against the directed edge `a -> b`.
pub fn classify(a: Point, b: Point, candidate: GridPos) -> Option<Adjacency> {
    let heading = Heading::between(a, b)?;
    let outward = heading.left();
    let low = candidate.corner(false, false);
    let high = candidate.corner(true, true);

    let touching = match outward {
        Heading::North => low.z == a.z,
        Heading::South => high.z == a.z,
        Heading::East => low.x == a.x,
        Heading::West => high.x == a.x,
    };
    if !touching {
        return None;
    }

    let span = if heading.is_x_axis() {
        Span::of(a.x.min(b.x), a.x.max(b.x), low.x, high.x)?
    } else {
        Span::of(a.z.min(b.z), a.z.max(b.z), low.z, high.z)?
    };

    let contact = match (span, outward, heading.is_x_axis()) {
        (Span::Middle, _, _) => return Some(Adjacency::MidSpan),
        (Span::Full, Heading::East, _) => EdgeContact::FullUpperX,
        (Span::Full, Heading::West, _) => EdgeContact::FullLowerX,
        (Span::Full, Heading::North, _) => EdgeContact::FullUpperZ,
        (Span::Full, Heading::South, _) => EdgeContact::FullLowerZ,
        (Span::Upper, _, true) => EdgeContact::EndUpperX,
        (Span::Lower, _, true) => EdgeContact::EndLowerX,
        (Span::Upper, _, false) => EdgeContact::EndUpperZ,
        (Span::Lower, _, false) => EdgeContact::EndLowerZ,
    };
    Some(Adjacency::Edge(contact))
}

/// Every contact between `candidate` and the rings of `outline`.
pub fn contacts(outline: &Outline, candidate: GridPos) -> Vec<Contact> {
    let mut found = Vec::new();
    for (ring_index, ring) in outline.rings().enumerate() {
        let following = ring.iter().cycle().skip(1);
        for (edge, (a, b)) in ring.iter().zip(following).enumerate() {
            if let Some(adjacency) = classify(*a, *b, candidate) {
                found.push(Contact {
                    ring: ring_index,
                    edge,
                    adjacency,
                });
            }
        }
    }
    found
}

/// Where a candidate's side falls within an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Full,
    Lower,
    Upper,
    Middle,
}

impl Span {
    fn of(edge_low: i64, edge_high: i64, low: i64, high: i64) -> Option<Self> {
        if low < edge_low || high > edge_high || high.saturating_sub(low) != CELL_SIZE {
            return None;
        }
        Some(match (low == edge_low, high == edge_high) {
            (true, true) => Self::Full,
            (true, false) => Self::Lower,
            (false, true) => Self::Upper,
            (false, false) => Self::Middle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Outline {
        Outline {
            exterior: vec![
                Point::new(0, 0),
                Point::new(0, 16),
                Point::new(16, 16),
                Point::new(16, 0),
            ],
            holes: Vec::new(),
        }
    }

    fn strip() -> Outline {
        // Three cells along x: (0,0) (1,0) (2,0).
        Outline {
            exterior: vec![
                Point::new(0, 0),
                Point::new(0, 16),
                Point::new(48, 16),
                Point::new(48, 0),
            ],
            holes: Vec::new(),
        }
    }

    fn only(outline: &Outline, x: i32, z: i32) -> Option<Adjacency> {
        match contacts(outline, GridPos::new(x, z)).as_slice() {
            [single] => Some(single.adjacency),
            _ => None,
        }
    }

    #[test]
    fn full_contacts_name_the_outward_side() {
        let outline = square();
        assert_eq!(only(&outline, 1, 0), Some(Adjacency::Edge(EdgeContact::FullUpperX)));
        assert_eq!(only(&outline, -1, 0), Some(Adjacency::Edge(EdgeContact::FullLowerX)));
        assert_eq!(only(&outline, 0, 1), Some(Adjacency::Edge(EdgeContact::FullUpperZ)));
        assert_eq!(only(&outline, 0, -1), Some(Adjacency::Edge(EdgeContact::FullLowerZ)));
    }

    #[test]
    fn end_contacts_name_the_edge_axis() {
        let outline = strip();
        assert_eq!(only(&outline, 0, 1), Some(Adjacency::Edge(EdgeContact::EndLowerX)));
        assert_eq!(only(&outline, 2, -1), Some(Adjacency::Edge(EdgeContact::EndUpperX)));

        let column = Outline {
            exterior: vec![
                Point::new(0, 0),
                Point::new(0, 48),
                Point::new(16, 48),
                Point::new(16, 0),
            ],
            holes: Vec::new(),
        };
        assert_eq!(only(&column, 1, 0), Some(Adjacency::Edge(EdgeContact::EndLowerZ)));
        assert_eq!(only(&column, -1, 2), Some(Adjacency::Edge(EdgeContact::EndUpperZ)));
    }

    #[test]
    fn middle_of_long_edge_is_mid_span() {
        assert_eq!(only(&strip(), 1, 1), Some(Adjacency::MidSpan));
    }

    #[test]
    fn diagonal_and_inside_cells_have_no_contact() {
        let outline = square();
        assert!(contacts(&outline, GridPos::new(1, 1)).is_empty());
        assert!(contacts(&outline, GridPos::new(0, 0)).is_empty());
        assert!(contacts(&outline, GridPos::new(5, 5)).is_empty());
    }

    #[test]
    fn notch_touches_three_edges() {
        // 3x2 block with (1,1) missing: the notch opens to +z.
        let outline = Outline {
            exterior: vec![
                Point::new(0, 0),
                Point::new(0, 32),
                Point::new(16, 32),
                Point::new(16, 16),
                Point::new(32, 16),
                Point::new(32, 32),
                Point::new(48, 32),
                Point::new(48, 0),
            ],
            holes: Vec::new(),
        };
        assert_eq!(contacts(&outline, GridPos::new(1, 1)).len(), 3);
    }
}
