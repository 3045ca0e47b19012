//! Ring construction and normalisation.
//!
//! [`trace`] rebuilds an [`Outline`] from scratch by walking the boundary
//! edges of a cell set. The splice path in [`crate::region`] edits rings in
//! place and then funnels them through [`simplify`] and [`finish`] so both
//! paths produce the same canonical form.

use std::collections::{BTreeMap, BTreeSet};

use parcel_types::{CELL_SIZE, Outline, Point};

use crate::grid::{GridPos, Heading};

/// A unit boundary edge: start vertex and heading.
type Edge = (Point, Heading);

/// Trace the canonical outline of a cell set.
///
/// Every cell side without a neighbour becomes a unit edge oriented with
/// the owned cell on its right. Edges are chained end to start; where two
/// edges leave the same vertex (a diagonal pinch) the right turn is taken,
/// which keeps each ring hugging a single cell through the pinch.
pub(crate) fn trace(cells: &BTreeSet<GridPos>) -> Outline {
    let edges = boundary_edges(cells);

    let mut outgoing: BTreeMap<Point, Vec<usize>> = BTreeMap::new();
    for (index, (start, _)) in edges.iter().enumerate() {
        outgoing.entry(*start).or_default().push(index);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used.get(first) != Some(&false) {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = first;
        loop {
            let Some(&(start, heading)) = edges.get(current) else {
                break;
            };
            if let Some(flag) = used.get_mut(current) {
                *flag = true;
            }
            ring.push(start);

            let end = heading.advance(start, CELL_SIZE);
            let Some(next) = successor(&outgoing, &edges, end, heading) else {
                break;
            };
            if next == first || used.get(next) != Some(&false) {
                break;
            }
            current = next;
        }
        rings.push(simplify(ring));
    }

    finish(rings)
}

fn boundary_edges(cells: &BTreeSet<GridPos>) -> Vec<Edge> {
    let open = |cell: GridPos, heading: Heading| {
        cell.step(heading)
            .is_none_or(|neighbour| !cells.contains(&neighbour))
    };

    let mut edges = Vec::new();
    for &cell in cells {
        if open(cell, Heading::West) {
            edges.push((cell.corner(false, false), Heading::North));
        }
        if open(cell, Heading::North) {
            edges.push((cell.corner(false, true), Heading::East));
        }
        if open(cell, Heading::East) {
            edges.push((cell.corner(true, true), Heading::South));
        }
        if open(cell, Heading::South) {
            edges.push((cell.corner(true, false), Heading::West));
        }
    }
    edges.sort_unstable();
    edges
}

fn successor(
    outgoing: &BTreeMap<Point, Vec<usize>>,
    edges: &[Edge],
    at: Point,
    arriving: Heading,
) -> Option<usize> {
    match outgoing.get(&at)?.as_slice() {
        [only] => Some(*only),
        many => many
            .iter()
            .copied()
            .find(|&index| {
                edges
                    .get(index)
                    .is_some_and(|(_, heading)| *heading == arriving.right())
            })
            .or_else(|| many.first().copied()),
    }
}

/// Drop duplicate, collinear and spike vertices until none remain.
pub(crate) fn simplify(mut ring: Vec<Point>) -> Vec<Point> {
    loop {
        let len = ring.len();
        if len < 3 {
            return ring;
        }

        let previous = ring.iter().cycle().skip(len.saturating_sub(1));
        let following = ring.iter().cycle().skip(1);
        let kept: Vec<Point> = previous
            .zip(ring.iter())
            .zip(following)
            .filter(|&((prev, vertex), next)| {
                if prev == vertex {
                    return false;
                }
                match (Heading::between(*prev, *vertex), Heading::between(*vertex, *next)) {
                    (Some(incoming), Some(outgoing)) => {
                        outgoing != incoming && outgoing != incoming.opposite()
                    }
                    _ => true,
                }
            })
            .map(|((_, vertex), _)| *vertex)
            .collect();

        if kept.len() == len {
            return kept;
        }
        ring = kept;
    }
}

/// Canonicalise rings and sort them into exterior and holes.
///
/// The clockwise ring with the largest area is the exterior; every other
/// ring is a hole. Each ring starts at its smallest vertex and holes are
/// ordered by their vertex sequence.
pub(crate) fn finish(rings: Vec<Vec<Point>>) -> Outline {
    let mut exterior: Option<(i128, Vec<Point>)> = None;
    let mut holes = Vec::new();

    for ring in rings {
        if ring.len() < 4 {
            continue;
        }
        let ring = rotate_to_min(ring);
        let area = signed_area(&ring);
        let larger = exterior.as_ref().is_none_or(|(best, _)| area < *best);
        if area < 0 && larger {
            if let Some((_, previous)) = exterior.replace((area, ring)) {
                holes.push(previous);
            }
        } else {
            holes.push(ring);
        }
    }

    holes.sort();
    Outline {
        exterior: exterior.map(|(_, ring)| ring).unwrap_or_default(),
        holes,
    }
}

fn rotate_to_min(mut ring: Vec<Point>) -> Vec<Point> {
    let start = ring
        .iter()
        .enumerate()
        .min_by_key(|(_, vertex)| **vertex)
        .map_or(0, |(index, _)| index);
    ring.rotate_left(start);
    ring
}

/// Twice the shoelace area. Negative for clockwise rings.
pub(crate) fn signed_area(ring: &[Point]) -> i128 {
    let following = ring.iter().cycle().skip(1);
    ring.iter().zip(following).fold(0_i128, |acc, (a, b)| {
        let cross = i128::from(a.x)
            .saturating_mul(i128::from(b.z))
            .saturating_sub(i128::from(b.x).saturating_mul(i128::from(a.z)));
        acc.saturating_add(cross)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(list: &[(i32, i32)]) -> BTreeSet<GridPos> {
        list.iter().map(|&(x, z)| GridPos::new(x, z)).collect()
    }

    fn points(list: &[(i64, i64)]) -> Vec<Point> {
        list.iter().map(|&(x, z)| Point::new(x, z)).collect()
    }

    #[test]
    fn single_cell_is_a_clockwise_square() {
        let outline = trace(&cells(&[(0, 0)]));
        assert_eq!(outline.exterior, points(&[(0, 0), (0, 16), (16, 16), (16, 0)]));
        assert!(outline.holes.is_empty());
        assert!(signed_area(&outline.exterior) < 0);
    }

    #[test]
    fn two_by_two_block_has_four_vertices() {
        let outline = trace(&cells(&[(0, 0), (1, 0), (0, 1), (1, 1)]));
        assert_eq!(outline.exterior, points(&[(0, 0), (0, 32), (32, 32), (32, 0)]));
    }

    #[test]
    fn ring_with_center_missing_has_a_hole() {
        let outline = trace(&cells(&[
            (0, 0),
            (1, 0),
            (2, 0),
            (0, 1),
            (2, 1),
            (0, 2),
            (1, 2),
            (2, 2),
        ]));
        assert_eq!(outline.exterior, points(&[(0, 0), (0, 48), (48, 48), (48, 0)]));
        assert_eq!(
            outline.holes,
            vec![points(&[(16, 16), (32, 16), (32, 32), (16, 32)])]
        );
        assert_eq!(outline.vertex_count(), 8);
    }

    #[test]
    fn l_shape_has_six_vertices() {
        let outline = trace(&cells(&[(0, 0), (1, 0), (0, 1)]));
        assert_eq!(
            outline.exterior,
            points(&[(0, 0), (0, 32), (16, 32), (16, 16), (32, 16), (32, 0)])
        );
    }

    #[test]
    fn simplify_removes_collinear_and_duplicate_vertices() {
        let ring = points(&[(0, 0), (0, 16), (0, 16), (0, 32), (16, 32), (16, 0), (8, 0)]);
        assert_eq!(simplify(ring), points(&[(0, 0), (0, 32), (16, 32), (16, 0)]));
    }

    #[test]
    fn simplify_removes_spikes() {
        let ring = points(&[(0, 0), (0, 16), (0, 32), (0, 16), (16, 16), (16, 0)]);
        assert_eq!(simplify(ring), points(&[(0, 0), (0, 16), (16, 16), (16, 0)]));
    }

    #[test]
    fn finish_rotates_to_smallest_vertex() {
        let outline = finish(vec![points(&[(16, 16), (16, 0), (0, 0), (0, 16)])]);
        assert_eq!(outline.exterior, points(&[(0, 0), (0, 16), (16, 16), (16, 0)]));
    }

    #[test]
    fn empty_set_traces_to_empty_outline() {
        assert_eq!(trace(&BTreeSet::new()), Outline::default());
    }
}
