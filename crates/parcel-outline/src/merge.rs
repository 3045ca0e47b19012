//! Greedy merge of a claimant's cells into regions.

use std::collections::{BTreeMap, BTreeSet};

use parcel_types::{CellTag, ClaimantKey, DimensionId};

use crate::region::Region;

/// Group `cells` into maximal 4-connected regions, one outline each.
///
/// Input is deduplicated and consumed in row-major order, so the result
/// depends only on the set of cells. Regions come back ordered by
/// dimension and then by their smallest cell.
pub fn merge<'a>(cells: impl IntoIterator<Item = &'a CellTag>, owner: ClaimantKey) -> Vec<Region> {
    let sorted: BTreeSet<&CellTag> = cells.into_iter().collect();
    merge_in_order(sorted, owner)
}

/// Merge cells in the order given.
///
/// Each cell is offered to the existing regions of its dimension in turn;
/// the first to accept it keeps it and absorbs any later region the cell
/// also touches. A cell no region accepts seeds a new one. The resulting
/// cell partition is the same for every order; only intermediate work
/// differs.
pub fn merge_in_order<'a>(
    cells: impl IntoIterator<Item = &'a CellTag>,
    owner: ClaimantKey,
) -> Vec<Region> {
    let mut by_dimension: BTreeMap<&DimensionId, Vec<Region>> = BTreeMap::new();
    let mut offered = 0_usize;

    for cell in cells {
        offered = offered.saturating_add(1);
        place(by_dimension.entry(&cell.dimension).or_default(), cell, owner);
    }

    let mut regions: Vec<Region> = by_dimension.into_values().flatten().collect();
    regions.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    tracing::debug!(
        owner = %owner,
        cells = offered,
        regions = regions.len(),
        "merged cells into regions"
    );
    regions
}

fn place(regions: &mut Vec<Region>, cell: &CellTag, owner: ClaimantKey) {
    if regions.iter().any(|region| region.contains(cell)) {
        return;
    }

    let mut home = None;
    let mut bridged = Vec::new();
    for (index, region) in regions.iter_mut().enumerate() {
        if home.is_none() {
            if region.try_consume(cell) {
                home = Some(index);
            }
        } else if region.touches(cell) {
            bridged.push(index);
        }
    }

    let Some(home) = home else {
        regions.push(Region::new(owner, cell));
        return;
    };

    // Every bridged index is above `home`, so removing from the back keeps
    // `home` valid.
    let absorbed: Vec<Region> = bridged
        .into_iter()
        .rev()
        .map(|index| regions.remove(index))
        .collect();
    if let Some(target) = regions.get_mut(home) {
        target.absorb(absorbed);
    }
}
