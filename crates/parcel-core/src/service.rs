//! The claim service: the surface external collaborators call.
//!
//! [`ClaimService`] ties the claimant registry, the cell ownership cache,
//! the permission evaluator and the outline engine together. Gameplay hooks
//! resolve a cell and ask [`can_perform`](ClaimService::can_perform); map
//! renderers ask [`regions_for`](ClaimService::regions_for); claim commands
//! go through [`claim_cells`](ClaimService::claim_cells) and friends so the
//! cell store and the owners' cell sets move together.

use std::collections::BTreeSet;
use std::sync::Arc;

use parcel_outline::Region;
use parcel_registry::{
    Actor, Claimant, FlushReport, Group, OwnerStore, RegistryCache, RegistryError, SweepReport,
};
use parcel_types::{
    ActorId, CellOwnership, CellTag, ClaimantKey, DimensionId, GroupId, Permission,
    RegionOutline, Setting,
};
use tracing::{info, warn};

use crate::cell_cache::{CellOwnershipCache, CellStore};
use crate::config::ParcelConfig;
use crate::error::CoreError;
use crate::permission;

// ---------------------------------------------------------------------------
// Claim outcomes
// ---------------------------------------------------------------------------

/// Why a cell was left alone by a claim or unclaim request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRefusal {
    /// Someone else already owns the cell.
    OwnedByOther,
    /// The actor has reached the configured personal claim limit.
    LimitReached,
    /// The cell is not owned by the claimant asking to release it.
    NotOwned,
}

/// Per-cell result of a claim or unclaim request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimOutcome {
    /// Cells whose ownership changed.
    pub changed: Vec<CellTag>,
    /// Cells that already had the requested ownership.
    pub unchanged: Vec<CellTag>,
    /// Cells that were refused, with the reason.
    pub refused: Vec<(CellTag, ClaimRefusal)>,
}

impl ClaimOutcome {
    /// Whether every requested cell ended up with the requested ownership.
    pub fn is_complete(&self) -> bool {
        self.refused.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ClaimService
// ---------------------------------------------------------------------------

/// Facade over the registry, the cell cache and the outline engine.
#[derive(Debug)]
pub struct ClaimService<O, C> {
    registry: RegistryCache<O>,
    cells: CellOwnershipCache<O, C>,
    config: ParcelConfig,
}

impl<O: OwnerStore, C: CellStore> ClaimService<O, C> {
    /// Create a service over the two persistent stores.
    pub fn new(owners: Arc<O>, cells: Arc<C>, config: ParcelConfig) -> Self {
        let registry = RegistryCache::new(owners);
        let cells = CellOwnershipCache::new(cells, registry.clone());
        Self {
            registry,
            cells,
            config,
        }
    }

    /// The claimant registry, for membership and record edits.
    pub const fn registry(&self) -> &RegistryCache<O> {
        &self.registry
    }

    /// The cell ownership cache.
    pub const fn cells(&self) -> &CellOwnershipCache<O, C> {
        &self.cells
    }

    /// The configuration the service was built with.
    pub const fn config(&self) -> &ParcelConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// The live record for a claimant.
    pub async fn lookup_owner(&self, key: ClaimantKey) -> Result<Claimant, CoreError> {
        Ok(self.registry.get_or_load(key).await?)
    }

    /// Who owns `cell`.
    pub async fn resolve_cell(&self, cell: &CellTag) -> Result<CellOwnership, CoreError> {
        self.cells.resolve(cell).await
    }

    /// Signal that `cell` left memory; its memoised entry is dropped.
    pub fn cell_unloaded(&self, cell: &CellTag) -> bool {
        self.cells.cell_unloaded(cell)
    }

    /// Whether any cell within `radius` cells of `center` is claimed.
    pub async fn is_owned_by_anyone_within(
        &self,
        center: &CellTag,
        radius: u32,
    ) -> Result<bool, CoreError> {
        self.cells.is_owned_by_anyone_within(center, radius).await
    }

    /// Whether a claim lies within the configured spawn radius of `center`.
    pub async fn is_spawn_protected(&self, center: &CellTag) -> Result<bool, CoreError> {
        self.is_owned_by_anyone_within(center, self.config.protection.spawn_radius)
            .await
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Whether `requester` may perform `permission` on a resolved cell.
    pub async fn can_perform(
        &self,
        requester: ActorId,
        cell: &CellOwnership,
        permission: Permission,
    ) -> Result<bool, CoreError> {
        let Some(actor_owner) = cell.actor_owner else {
            return Ok(true);
        };
        if requester == actor_owner {
            return Ok(true);
        }
        let group = self.group_of(cell).await?;
        let owner = self.registry.actor(actor_owner).await?;
        Ok(permission::can_perform(
            requester,
            cell,
            group.as_ref(),
            Some(owner.claimant()),
            permission,
        ))
    }

    /// Whether `setting` is on for a resolved cell.
    pub async fn is_setting_enabled(
        &self,
        cell: &CellOwnership,
        setting: Setting,
    ) -> Result<bool, CoreError> {
        let group = self.group_of(cell).await?;
        let owner = match (group.as_ref(), cell.actor_owner) {
            (None, Some(actor)) => Some(self.registry.actor(actor).await?),
            _ => None,
        };
        Ok(permission::is_setting_enabled(
            cell,
            group.as_ref(),
            owner.as_ref().map(Actor::claimant),
            setting,
            &self.config.settings,
        ))
    }

    /// The cell's group record, or `None` if unset or since deleted.
    async fn group_of(&self, cell: &CellOwnership) -> Result<Option<Group>, CoreError> {
        let Some(id) = cell.group_owner else {
            return Ok(None);
        };
        match self.registry.group(id).await {
            Ok(group) => Ok(Some(group)),
            Err(RegistryError::GroupNotFound(_)) => {
                warn!(cell = %cell.cell, group = %id, "Cell names a group that no longer exists");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Regions
    // -----------------------------------------------------------------------

    /// The owner's cells in `dimension`, merged into regions.
    ///
    /// Built from a snapshot of the owner's cell set; cells claimed while
    /// the merge runs appear on the next call.
    pub async fn regions_for(
        &self,
        owner: ClaimantKey,
        dimension: &DimensionId,
    ) -> Result<Vec<Region>, CoreError> {
        let record = self.lookup_owner(owner).await?;
        let cells = record.owned_cells_in(dimension);
        Ok(parcel_outline::merge(&cells, owner))
    }

    /// The owner's regions in `dimension` as renderer-facing outlines.
    pub async fn region_outlines(
        &self,
        owner: ClaimantKey,
        dimension: &DimensionId,
    ) -> Result<Vec<RegionOutline>, CoreError> {
        let regions = self.regions_for(owner, dimension).await?;
        Ok(regions.iter().map(Region::to_outline).collect())
    }

    // -----------------------------------------------------------------------
    // Claims
    // -----------------------------------------------------------------------

    /// Claim unowned cells for `actor` personally.
    ///
    /// Cells owned by anyone else are refused, as are cells beyond the
    /// configured personal limit. Each cell is taken with a conditional
    /// store write, so a concurrent claim on the same cell loses cleanly.
    pub async fn claim_cells(
        &self,
        actor: ActorId,
        cells: &[CellTag],
    ) -> Result<ClaimOutcome, CoreError> {
        let record = self.registry.actor(actor).await?;
        let limit = self.config.protection.claim_limit();
        let mut held = record.owned_cell_count();
        let mut outcome = ClaimOutcome::default();

        for cell in dedup(cells) {
            let stored = self.cells.stored(&cell).await?;
            if stored.actor_owner == Some(actor) && stored.group_owner.is_none() {
                outcome.unchanged.push(cell);
                continue;
            }
            if !stored.is_unclaimed() {
                outcome.refused.push((cell, ClaimRefusal::OwnedByOther));
                continue;
            }
            if limit.is_some_and(|limit| held >= limit) {
                outcome.refused.push((cell, ClaimRefusal::LimitReached));
                continue;
            }
            if let Some(holder) = self.cells.claim_unowned(&cell, actor, None).await? {
                if held_by(&holder, ClaimantKey::actor(actor)) {
                    outcome.unchanged.push(cell);
                } else {
                    outcome.refused.push((cell, ClaimRefusal::OwnedByOther));
                }
                continue;
            }
            record.add_cells(std::slice::from_ref(&cell));
            held = held.saturating_add(1);
            outcome.changed.push(cell);
        }

        log_outcome("claim", ClaimantKey::actor(actor), &outcome);
        Ok(outcome)
    }

    /// Claim unowned cells for `group`. The group's owner becomes the
    /// cells' actor owner.
    pub async fn claim_cells_for_group(
        &self,
        group: GroupId,
        cells: &[CellTag],
    ) -> Result<ClaimOutcome, CoreError> {
        let record = self.registry.group(group).await?;
        let owner = record.owner();
        let mut outcome = ClaimOutcome::default();

        for cell in dedup(cells) {
            let stored = self.cells.stored(&cell).await?;
            if stored.group_owner == Some(group) {
                outcome.unchanged.push(cell);
                continue;
            }
            if !stored.is_unclaimed() {
                outcome.refused.push((cell, ClaimRefusal::OwnedByOther));
                continue;
            }
            if let Some(holder) = self.cells.claim_unowned(&cell, owner, Some(group)).await? {
                if held_by(&holder, ClaimantKey::group(group)) {
                    outcome.unchanged.push(cell);
                } else {
                    outcome.refused.push((cell, ClaimRefusal::OwnedByOther));
                }
                continue;
            }
            record.add_cells(std::slice::from_ref(&cell));
            outcome.changed.push(cell);
        }

        log_outcome("claim", ClaimantKey::group(group), &outcome);
        Ok(outcome)
    }

    /// Release cells held by `claimant`. Cells it does not hold are refused.
    pub async fn unclaim_cells(
        &self,
        claimant: ClaimantKey,
        cells: &[CellTag],
    ) -> Result<ClaimOutcome, CoreError> {
        let record = self.lookup_owner(claimant).await?;
        let mut outcome = ClaimOutcome::default();

        for cell in dedup(cells) {
            let stored = self.cells.stored(&cell).await?;
            if !held_by(&stored, claimant) {
                outcome.refused.push((cell, ClaimRefusal::NotOwned));
                continue;
            }
            self.cells.update_actor_owner(&cell, None).await?;
            record.remove_cells(std::slice::from_ref(&cell));
            outcome.changed.push(cell);
        }

        log_outcome("unclaim", claimant, &outcome);
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Save every dirty claimant record.
    pub async fn flush(&self) -> FlushReport {
        self.registry.flush_dirty().await
    }

    /// Save dirty records and evict unreferenced clean ones.
    pub async fn sweep(&self) -> SweepReport {
        self.registry.sweep().await
    }
}

/// Whether the stored row attributes `cell` to `claimant`.
fn held_by(stored: &CellOwnership, claimant: ClaimantKey) -> bool {
    if let Some(group) = claimant.as_group() {
        return stored.group_owner == Some(group);
    }
    claimant.as_actor().is_some_and(|actor| {
        stored.actor_owner == Some(actor) && stored.group_owner.is_none()
    })
}

fn dedup(cells: &[CellTag]) -> BTreeSet<CellTag> {
    cells.iter().cloned().collect()
}

fn log_outcome(action: &'static str, claimant: ClaimantKey, outcome: &ClaimOutcome) {
    if outcome.changed.is_empty() && outcome.refused.is_empty() {
        return;
    }
    info!(
        action,
        claimant = %claimant,
        changed = outcome.changed.len(),
        unchanged = outcome.unchanged.len(),
        refused = outcome.refused.len(),
        "Claim request processed"
    );
}
