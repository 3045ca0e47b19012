//! Connected owned regions and incremental cell consumption.
//!
//! A [`Region`] is a 4-connected set of cells with one owner in one
//! dimension, plus its traced [`Outline`]. Cells join through
//! [`Region::try_consume`], which splices the outline in place when the
//! candidate touches exactly one edge with clear flanks and retraces it
//! otherwise.

use std::collections::BTreeSet;

use parcel_types::{CELL_SIZE, CellTag, ClaimantKey, DimensionId, Outline, Point, RegionOutline};

use crate::contact::{self, Adjacency, Contact};
use crate::corners;
use crate::grid::{GridPos, Heading};
use crate::ring;

/// A 4-connected set of cells sharing one owner and dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    owner: ClaimantKey,
    dimension: DimensionId,
    cells: BTreeSet<GridPos>,
    outline: Outline,
}

impl Region {
    /// Seed a region with a single cell.
    pub fn new(owner: ClaimantKey, seed: &CellTag) -> Self {
        let cells = BTreeSet::from([GridPos::of(seed)]);
        let outline = ring::trace(&cells);
        Self {
            owner,
            dimension: seed.dimension.clone(),
            cells,
            outline,
        }
    }

    /// The claimant owning every cell.
    pub const fn owner(&self) -> ClaimantKey {
        self.owner
    }

    /// The plane this region lives in.
    pub const fn dimension(&self) -> &DimensionId {
        &self.dimension
    }

    /// The traced boundary.
    pub const fn outline(&self) -> &Outline {
        &self.outline
    }

    /// The cell positions, without dimension.
    pub const fn grid(&self) -> &BTreeSet<GridPos> {
        &self.cells
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate over the cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellTag> + '_ {
        self.cells.iter().map(|pos| pos.tag(&self.dimension))
    }

    /// Whether `cell` is part of this region.
    pub fn contains(&self, cell: &CellTag) -> bool {
        cell.dimension == self.dimension && self.cells.contains(&GridPos::of(cell))
    }

    /// Whether `cell` is outside the region and shares a side with it.
    pub fn touches(&self, cell: &CellTag) -> bool {
        if cell.dimension != self.dimension {
            return false;
        }
        let pos = GridPos::of(cell);
        !self.cells.contains(&pos)
            && Heading::ALL.iter().any(|heading| {
                pos.step(*heading)
                    .is_some_and(|neighbour| self.cells.contains(&neighbour))
            })
    }

    /// Every edge contact between `candidate` and the outline.
    pub fn contacts(&self, candidate: &CellTag) -> Vec<Contact> {
        if candidate.dimension != self.dimension {
            return Vec::new();
        }
        contact::contacts(&self.outline, GridPos::of(candidate))
    }

    /// Try to add `candidate` to the region.
    ///
    /// Returns `false` and leaves the region untouched when the candidate is
    /// in another dimension, already inside, or shares no side with the
    /// outline.
    pub fn try_consume(&mut self, candidate: &CellTag) -> bool {
        if candidate.dimension != self.dimension {
            return false;
        }
        let pos = GridPos::of(candidate);
        if self.cells.contains(&pos) {
            return false;
        }

        let found = contact::contacts(&self.outline, pos);
        if found.is_empty() {
            return false;
        }
        self.cells.insert(pos);

        let spliced = match found.as_slice() {
            [single] => self.splice(single, pos),
            _ => false,
        };
        if !spliced {
            tracing::trace!(
                owner = %self.owner,
                cell = %candidate,
                contacts = found.len(),
                "retracing region outline"
            );
            self.outline = ring::trace(&self.cells);
        }
        true
    }

    /// Merge other regions of the same owner and dimension into this one.
    ///
    /// The outline is retraced once after every cell has been added.
    pub fn absorb(&mut self, others: impl IntoIterator<Item = Self>) {
        let mut grew = false;
        for other in others {
            if other.dimension != self.dimension {
                continue;
            }
            self.cells.extend(other.cells);
            grew = true;
        }
        if grew {
            self.outline = ring::trace(&self.cells);
        }
    }

    /// Vertices found by classifying every cell corner in isolation.
    ///
    /// Always equal to the set of vertices on the outline's rings.
    pub fn corner_vertices(&self) -> BTreeSet<Point> {
        corners::vertices(&self.cells)
    }

    /// Renderer-facing summary.
    pub fn to_outline(&self) -> RegionOutline {
        RegionOutline {
            owner: self.owner,
            dimension: self.dimension.clone(),
            cell_count: u32::try_from(self.cells.len()).unwrap_or(u32::MAX),
            outline: self.outline.clone(),
        }
    }

    /// Ordering key: dimension, then smallest cell.
    pub(crate) fn sort_key(&self) -> (&DimensionId, Option<&GridPos>) {
        (&self.dimension, self.cells.first())
    }

    /// Edit one ring in place for a single clean contact.
    ///
    /// Returns `false` when the flanks are not clear or the contact is
    /// mid-span; the caller then retraces.
    fn splice(&mut self, found: &Contact, pos: GridPos) -> bool {
        if !matches!(found.adjacency, Adjacency::Edge(_)) {
            return false;
        }

        let Outline { exterior, holes } = std::mem::take(&mut self.outline);
        let mut rings: Vec<Vec<Point>> = Vec::with_capacity(holes.len().saturating_add(1));
        rings.push(exterior);
        rings.extend(holes);

        let edited = rings
            .get_mut(found.ring)
            .is_some_and(|ring| self.splice_ring(ring, found.edge, pos));
        self.outline = ring::finish(rings);
        edited
    }

    fn splice_ring(&self, ring: &mut Vec<Point>, edge: usize, pos: GridPos) -> bool {
        if edge >= ring.len() {
            return false;
        }
        ring.rotate_left(edge);
        let (Some(&a), Some(&b)) = (ring.first(), ring.get(1)) else {
            return false;
        };
        let Some(heading) = Heading::between(a, b) else {
            return false;
        };
        let outward = heading.left();
        if !self.flanks_clear(pos, outward) {
            return false;
        }

        // The candidate's side on the edge line, nearest `a` first.
        let (near, far) = if heading.is_x_axis() {
            let low = Point::new(pos.corner(false, false).x, a.z);
            let high = Point::new(pos.corner(true, false).x, a.z);
            if heading == Heading::East { (low, high) } else { (high, low) }
        } else {
            let low = Point::new(a.x, pos.corner(false, false).z);
            let high = Point::new(a.x, pos.corner(false, true).z);
            if heading == Heading::North { (low, high) } else { (high, low) }
        };
        let lift = |point: Point| outward.advance(point, CELL_SIZE);

        let replacement = match (near == a, far == b) {
            (true, true) => vec![lift(a), lift(b)],
            (true, false) => vec![lift(a), lift(far), far, b],
            (false, true) => vec![a, near, lift(near), lift(b)],
            (false, false) => return false,
        };

        let rest = ring.get(2..).unwrap_or_default();
        let spliced: Vec<Point> = replacement.into_iter().chain(rest.iter().copied()).collect();
        *ring = ring::simplify(spliced);
        true
    }

    /// The five cells around `pos` away from the contact side are unowned.
    fn flanks_clear(&self, pos: GridPos, outward: Heading) -> bool {
        let owned = |cell: Option<GridPos>| cell.is_some_and(|c| self.cells.contains(&c));
        let side_a = outward.left();
        let side_b = outward.right();
        !owned(pos.step(side_a))
            && !owned(pos.step(side_b))
            && !owned(pos.step(outward))
            && !owned(pos.step2(outward, side_a))
            && !owned(pos.step2(outward, side_b))
    }
}

#[cfg(test)]
mod tests {
    use parcel_types::ActorId;

    use super::*;

    fn owner() -> ClaimantKey {
        ClaimantKey::actor(ActorId::new())
    }

    fn tag(x: i32, z: i32) -> CellTag {
        CellTag::new("overworld", x, z)
    }

    fn points(list: &[(i64, i64)]) -> Vec<Point> {
        list.iter().map(|&(x, z)| Point::new(x, z)).collect()
    }

    fn build(list: &[(i32, i32)]) -> Region {
        let mut iter = list.iter();
        let &(x, z) = iter.next().unwrap_or(&(0, 0));
        let mut region = Region::new(owner(), &tag(x, z));
        for &(x, z) in iter {
            assert!(region.try_consume(&tag(x, z)), "({x}, {z}) rejected");
        }
        region
    }

    #[test]
    fn full_share_extends_the_edge() {
        let region = build(&[(0, 0), (1, 0)]);
        assert_eq!(
            region.outline().exterior,
            points(&[(0, 0), (0, 16), (32, 16), (32, 0)])
        );
    }

    #[test]
    fn end_contact_inserts_a_step() {
        let region = build(&[(0, 0), (1, 0), (0, 1)]);
        assert_eq!(
            region.outline().exterior,
            points(&[(0, 0), (0, 32), (16, 32), (16, 16), (32, 16), (32, 0)])
        );
        let region = build(&[(0, 0), (1, 0), (1, 1)]);
        assert_eq!(
            region.outline().exterior,
            points(&[(0, 0), (0, 16), (16, 16), (16, 32), (32, 32), (32, 0)])
        );
    }

    #[test]
    fn two_by_two_block_in_row_order() {
        let region = build(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(
            region.outline().exterior,
            points(&[(0, 0), (0, 32), (32, 32), (32, 0)])
        );
        assert!(region.outline().holes.is_empty());
    }

    #[test]
    fn mid_span_contact_is_retraced() {
        let region = build(&[(0, 0), (1, 0), (2, 0), (1, 1)]);
        assert_eq!(region.outline().vertex_count(), 8);
        assert_eq!(region.corner_vertices().len(), 8);
    }

    #[test]
    fn filling_a_notch_restores_the_rectangle() {
        let mut region = build(&[(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (2, 2)]);
        assert!(region.try_consume(&tag(1, 2)));
        assert_eq!(region.outline().vertex_count(), 8);
        assert_eq!(region.outline().holes.len(), 1);

        assert!(region.try_consume(&tag(1, 1)));
        assert_eq!(
            region.outline().exterior,
            points(&[(0, 0), (0, 48), (48, 48), (48, 0)])
        );
        assert!(region.outline().holes.is_empty());
    }

    #[test]
    fn non_adjacent_candidates_are_rejected() {
        let mut region = build(&[(0, 0)]);
        let before = region.clone();
        assert!(!region.try_consume(&tag(1, 1)));
        assert!(!region.try_consume(&tag(0, 0)));
        assert!(!region.try_consume(&CellTag::new("nether", 1, 0)));
        assert_eq!(region, before);
    }

    #[test]
    fn absorb_joins_regions_and_retraces() {
        let mut left = build(&[(0, 0)]);
        let right = Region::new(left.owner(), &tag(2, 0));
        assert!(left.try_consume(&tag(1, 0)));
        left.absorb([right]);
        assert_eq!(left.cell_count(), 3);
        assert_eq!(
            left.outline().exterior,
            points(&[(0, 0), (0, 16), (48, 16), (48, 0)])
        );
    }

    #[test]
    fn touches_ignores_diagonals() {
        let region = build(&[(0, 0)]);
        assert!(region.touches(&tag(0, 1)));
        assert!(!region.touches(&tag(1, 1)));
        assert!(!region.touches(&tag(0, 0)));
    }

    #[test]
    fn outline_summary_reports_cell_count() {
        let region = build(&[(0, 0), (0, 1)]);
        let summary = region.to_outline();
        assert_eq!(summary.cell_count, 2);
        assert_eq!(summary.owner, region.owner());
        assert_eq!(summary.outline.vertex_count(), 4);
    }
}
