//! Per-cell ownership lookup.
//!
//! [`CellOwnershipCache`] is a read-through cache over a [`CellStore`]. An
//! entry is memoised from the first [`resolve`](CellOwnershipCache::resolve)
//! until [`cell_unloaded`](CellOwnershipCache::cell_unloaded) is called for
//! that cell, and is kept in step with the store by the `update_*` methods.
//!
//! Writes go to the store first and only then refresh an entry that is
//! already resident; they never make a cell resident on their own.
//!
//! A row that names an actor but no group is attributed to the actor's
//! group when that actor is the group's owner. The outcome of that
//! derivation, a group or none, is cached on the entry until the next
//! write or unload but never written back to the store.

use std::collections::{BTreeMap, HashMap, btree_map};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use parcel_registry::{OwnerStore, RegistryCache, RegistryError, StoreError};
use parcel_types::{ActorId, CellOwnership, CellTag, DimensionId, GroupId};
use tracing::{debug, error};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// CellRange
// ---------------------------------------------------------------------------

/// An inclusive square of cells in one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    /// The dimension probed.
    pub dimension: DimensionId,
    /// Smallest x index, inclusive.
    pub min_x: i32,
    /// Largest x index, inclusive.
    pub max_x: i32,
    /// Smallest z index, inclusive.
    pub min_z: i32,
    /// Largest z index, inclusive.
    pub max_z: i32,
}

impl CellRange {
    /// The square of cells within `radius` of `center` on both axes.
    ///
    /// Clamped at the edge of the `i32` grid.
    pub fn around(center: &CellTag, radius: u32) -> Self {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX);
        Self {
            dimension: center.dimension.clone(),
            min_x: center.x.saturating_sub(radius),
            max_x: center.x.saturating_add(radius),
            min_z: center.z.saturating_sub(radius),
            max_z: center.z.saturating_add(radius),
        }
    }

    /// Whether `cell` lies inside the range.
    pub fn contains(&self, cell: &CellTag) -> bool {
        cell.dimension == self.dimension
            && (self.min_x..=self.max_x).contains(&cell.x)
            && (self.min_z..=self.max_z).contains(&cell.z)
    }
}

// ---------------------------------------------------------------------------
// CellStore
// ---------------------------------------------------------------------------

/// A persistent store of per-cell ownership rows.
pub trait CellStore: Send + Sync + 'static {
    /// Fetch the row for `cell`, if one is stored.
    fn load(
        &self,
        cell: &CellTag,
    ) -> impl Future<Output = Result<Option<CellOwnership>, StoreError>> + Send;

    /// Store `row` under its own cell. An unclaimed row removes the cell.
    fn save(&self, row: &CellOwnership) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store `row` only if its cell has no row yet, atomically.
    ///
    /// Returns whether the row was written. `row` must name an owner.
    fn claim_if_unclaimed(
        &self,
        row: &CellOwnership,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Whether any cell inside `range` is claimed, without loading rows.
    fn any_claimed_within(
        &self,
        range: &CellRange,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// In-memory [`CellStore`].
#[derive(Debug, Default)]
pub struct MemoryCellStore {
    rows: Mutex<BTreeMap<CellTag, CellOwnership>>,
    failing: AtomicBool,
    loads: AtomicUsize,
}

impl MemoryCellStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `row` under an arbitrary key, bypassing the identity check.
    pub fn insert_raw(&self, key: CellTag, row: CellOwnership) {
        self.rows().insert(key, row);
    }

    /// The row currently stored for `cell`.
    pub fn get(&self, cell: &CellTag) -> Option<CellOwnership> {
        self.rows().get(cell).cloned()
    }

    /// Number of claimed cells.
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    /// Whether no cell is claimed.
    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Number of `load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable(String::from("cell store offline")));
        }
        Ok(())
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<CellTag, CellOwnership>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CellStore for MemoryCellStore {
    async fn load(&self, cell: &CellTag) -> Result<Option<CellOwnership>, StoreError> {
        self.check()?;
        self.loads.fetch_add(1, Ordering::AcqRel);
        tokio::task::yield_now().await;
        Ok(self.get(cell))
    }

    async fn save(&self, row: &CellOwnership) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows();
        if row.is_unclaimed() {
            rows.remove(&row.cell);
        } else {
            rows.insert(row.cell.clone(), row.clone());
        }
        Ok(())
    }

    async fn claim_if_unclaimed(&self, row: &CellOwnership) -> Result<bool, StoreError> {
        self.check()?;
        let mut rows = self.rows();
        match rows.entry(row.cell.clone()) {
            btree_map::Entry::Occupied(_) => Ok(false),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(row.clone());
                Ok(true)
            }
        }
    }

    async fn any_claimed_within(&self, range: &CellRange) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.rows().keys().any(|cell| range.contains(cell)))
    }
}

// ---------------------------------------------------------------------------
// CellOwnershipCache
// ---------------------------------------------------------------------------

/// Group attribution of an actor-only row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derivation {
    /// Not worked out yet.
    Pending,
    /// The actor leads no group.
    Absent,
    Group(GroupId),
}

impl From<Option<GroupId>> for Derivation {
    fn from(group: Option<GroupId>) -> Self {
        group.map_or(Self::Absent, Self::Group)
    }
}

#[derive(Debug, Clone)]
struct ResolvedCell {
    stored: CellOwnership,
    derivation: Derivation,
}

impl ResolvedCell {
    const fn stored(stored: CellOwnership) -> Self {
        Self {
            stored,
            derivation: Derivation::Pending,
        }
    }

    fn effective(&self) -> CellOwnership {
        let mut row = self.stored.clone();
        if let (None, Derivation::Group(group)) = (row.group_owner, self.derivation) {
            row.group_owner = Some(group);
        }
        row
    }

    fn needs_derivation(&self) -> bool {
        self.stored.group_owner.is_none()
            && self.stored.actor_owner.is_some()
            && self.derivation == Derivation::Pending
    }
}

/// Memoised cell ownership over a [`CellStore`].
#[derive(Debug)]
pub struct CellOwnershipCache<O, C> {
    entries: RwLock<HashMap<CellTag, ResolvedCell>>,
    /// Bumped under the entry lock by every write.
    writes: AtomicU64,
    store: Arc<C>,
    registry: RegistryCache<O>,
}

impl<O: OwnerStore, C: CellStore> CellOwnershipCache<O, C> {
    /// Create an empty cache over `store`, deriving groups via `registry`.
    pub fn new(store: Arc<C>, registry: RegistryCache<O>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            writes: AtomicU64::new(0),
            store,
            registry,
        }
    }

    /// The backing cell store.
    pub const fn store(&self) -> &Arc<C> {
        &self.store
    }

    /// Who owns `cell`, with the group derived from the actor when unset.
    ///
    /// The first call for a cell reads the store; later calls are served
    /// from memory until [`cell_unloaded`](Self::cell_unloaded).
    pub async fn resolve(&self, cell: &CellTag) -> Result<CellOwnership, CoreError> {
        let resolved = match self.cached(cell) {
            Some(resolved) => resolved,
            None => self.load(cell).await?,
        };
        if !resolved.needs_derivation() {
            return Ok(resolved.effective());
        }
        let Some(actor) = resolved.stored.actor_owner else {
            return Ok(resolved.effective());
        };

        let group = self.derive_group(actor).await?;
        self.remember_derived(cell, actor, group);
        let mut row = resolved.stored;
        row.group_owner = group;
        Ok(row)
    }

    /// The persisted ownership pair for `cell`, without group derivation.
    ///
    /// Served from memory when the cell is resident; never makes it
    /// resident.
    pub async fn stored(&self, cell: &CellTag) -> Result<CellOwnership, CoreError> {
        if let Some(resolved) = self.cached(cell) {
            return Ok(resolved.stored);
        }
        self.fetch(cell).await
    }

    /// Set the claiming actor of `cell`, clearing any explicit group.
    ///
    /// `None` releases the cell entirely.
    pub async fn update_actor_owner(
        &self,
        cell: &CellTag,
        actor: Option<ActorId>,
    ) -> Result<(), CoreError> {
        self.write(CellOwnership {
            cell: cell.clone(),
            actor_owner: actor,
            group_owner: None,
        })
        .await
    }

    /// Set or clear the explicit group of `cell`, keeping its actor.
    pub async fn update_group_owner(
        &self,
        cell: &CellTag,
        group: Option<GroupId>,
    ) -> Result<(), CoreError> {
        let mut row = self.stored(cell).await?;
        row.group_owner = group;
        self.write(row).await
    }

    /// Claim `cell` for `actor` (and optionally `group`) if nobody holds it.
    ///
    /// The store decides atomically, so of two racing claims exactly one
    /// wins. Returns `None` on success, or the row that blocked the claim.
    pub async fn claim_unowned(
        &self,
        cell: &CellTag,
        actor: ActorId,
        group: Option<GroupId>,
    ) -> Result<Option<CellOwnership>, CoreError> {
        let row = CellOwnership {
            cell: cell.clone(),
            actor_owner: Some(actor),
            group_owner: group,
        };
        if self.store.claim_if_unclaimed(&row).await? {
            debug!(cell = %cell, actor = %actor, group = ?group, "Cell claimed");
            self.refresh(row);
            return Ok(None);
        }

        let holder = self.fetch(cell).await?;
        debug!(cell = %cell, holder = ?holder.actor_owner, "Cell already claimed");
        self.refresh(holder.clone());
        Ok(Some(holder))
    }

    /// Drop the memoised entry for `cell`. Returns whether one existed.
    pub fn cell_unloaded(&self, cell: &CellTag) -> bool {
        let removed = self.write_entries().remove(cell).is_some();
        if removed {
            debug!(cell = %cell, "Cell unloaded");
        }
        removed
    }

    /// Whether `cell` currently has a memoised entry.
    pub fn is_resident(&self, cell: &CellTag) -> bool {
        self.read_entries().contains_key(cell)
    }

    /// Number of memoised entries.
    pub fn resident_count(&self) -> usize {
        self.read_entries().len()
    }

    /// Whether any cell within `radius` cells of `center` is claimed.
    ///
    /// Probes the store directly; nothing is loaded or cached.
    pub async fn is_owned_by_anyone_within(
        &self,
        center: &CellTag,
        radius: u32,
    ) -> Result<bool, CoreError> {
        let range = CellRange::around(center, radius);
        Ok(self.store.any_claimed_within(&range).await?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn cached(&self, cell: &CellTag) -> Option<ResolvedCell> {
        self.read_entries().get(cell).cloned()
    }

    async fn fetch(&self, cell: &CellTag) -> Result<CellOwnership, CoreError> {
        match self.store.load(cell).await? {
            Some(row) if row.cell == *cell => Ok(row),
            Some(row) => {
                error!(
                    expected = %cell,
                    found = %row.cell,
                    "Stored cell row does not match its key, refusing it"
                );
                Err(CoreError::CellMismatch {
                    expected: cell.clone(),
                    found: row.cell,
                })
            }
            None => Ok(CellOwnership::unclaimed(cell.clone())),
        }
    }

    async fn load(&self, cell: &CellTag) -> Result<ResolvedCell, CoreError> {
        let writes = self.writes.load(Ordering::Acquire);
        let row = self.fetch(cell).await?;
        let mut entries = self.write_entries();
        if let Some(resident) = entries.get(cell) {
            return Ok(resident.clone());
        }
        // A write that landed during the fetch may have made `row` stale.
        let resolved = ResolvedCell::stored(row);
        if self.writes.load(Ordering::Acquire) == writes {
            entries.insert(cell.clone(), resolved.clone());
        }
        Ok(resolved)
    }

    async fn write(&self, row: CellOwnership) -> Result<(), CoreError> {
        self.store.save(&row).await?;
        debug!(
            cell = %row.cell,
            actor = ?row.actor_owner,
            group = ?row.group_owner,
            "Cell ownership updated"
        );
        self.refresh(row);
        Ok(())
    }

    /// Replace the entry for `row.cell` if it is resident.
    fn refresh(&self, row: CellOwnership) {
        let mut entries = self.write_entries();
        self.writes.fetch_add(1, Ordering::AcqRel);
        if let Some(entry) = entries.get_mut(&row.cell) {
            *entry = ResolvedCell::stored(row);
        }
    }

    /// The group an actor-owned cell is attributed to, if any.
    async fn derive_group(&self, actor: ActorId) -> Result<Option<GroupId>, CoreError> {
        let Some(group_id) = self.registry.actor(actor).await?.group() else {
            return Ok(None);
        };
        match self.registry.group(group_id).await {
            Ok(group) if group.owner() == actor => Ok(Some(group_id)),
            Ok(_) | Err(RegistryError::GroupNotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn remember_derived(&self, cell: &CellTag, actor: ActorId, group: Option<GroupId>) {
        let mut entries = self.write_entries();
        let current = entries
            .get_mut(cell)
            .filter(|entry| entry.stored.actor_owner == Some(actor) && entry.needs_derivation());
        if let Some(entry) = current {
            entry.derivation = Derivation::from(group);
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<CellTag, ResolvedCell>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<CellTag, ResolvedCell>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parcel_registry::MemoryOwnerStore;

    use super::*;

    type Cache = CellOwnershipCache<MemoryOwnerStore, MemoryCellStore>;

    fn cache() -> (Cache, Arc<MemoryCellStore>, RegistryCache<MemoryOwnerStore>) {
        let cells = Arc::new(MemoryCellStore::new());
        let registry = RegistryCache::new(Arc::new(MemoryOwnerStore::new()));
        (
            CellOwnershipCache::new(Arc::clone(&cells), registry.clone()),
            cells,
            registry,
        )
    }

    fn tag(x: i32, z: i32) -> CellTag {
        CellTag::new("overworld", x, z)
    }

    #[tokio::test]
    async fn unclaimed_cell_resolves_empty_and_is_memoised() {
        let (cache, store, _) = cache();
        let row = cache.resolve(&tag(0, 0)).await.unwrap();
        assert!(row.is_unclaimed());
        cache.resolve(&tag(0, 0)).await.unwrap();
        assert_eq!(store.load_count(), 1);
        assert!(cache.is_resident(&tag(0, 0)));

        assert!(cache.cell_unloaded(&tag(0, 0)));
        assert!(!cache.cell_unloaded(&tag(0, 0)));
        cache.resolve(&tag(0, 0)).await.unwrap();
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn actor_without_group_keeps_group_empty() {
        let (cache, _, _) = cache();
        let actor = ActorId::new();
        cache.update_actor_owner(&tag(1, 1), Some(actor)).await.unwrap();
        let row = cache.resolve(&tag(1, 1)).await.unwrap();
        assert_eq!(row.actor_owner, Some(actor));
        assert_eq!(row.group_owner, None);
    }

    #[tokio::test]
    async fn founder_cells_are_attributed_to_their_group() {
        let (cache, store, registry) = cache();
        let founder = ActorId::new();
        let member = ActorId::new();
        let group = registry.create_group("Mill", founder).await.unwrap();
        let id = group.group_id();
        registry.invite(id, member).await.unwrap();
        registry.accept_invite(member, id).await.unwrap();

        cache.update_actor_owner(&tag(0, 0), Some(founder)).await.unwrap();
        cache.update_actor_owner(&tag(1, 0), Some(member)).await.unwrap();

        assert_eq!(cache.resolve(&tag(0, 0)).await.unwrap().group_owner, Some(id));
        // Plain members do not lend their cells to the group.
        assert_eq!(cache.resolve(&tag(1, 0)).await.unwrap().group_owner, None);
        // Derivation is cached, not persisted.
        assert_eq!(store.get(&tag(0, 0)).unwrap().group_owner, None);
        assert_eq!(cache.stored(&tag(0, 0)).await.unwrap().group_owner, None);
    }

    #[tokio::test]
    async fn updates_replace_the_whole_pair() {
        let (cache, store, _) = cache();
        let actor = ActorId::new();
        let group = GroupId::new();
        cache.resolve(&tag(2, 2)).await.unwrap();

        cache.update_actor_owner(&tag(2, 2), Some(actor)).await.unwrap();
        cache.update_group_owner(&tag(2, 2), Some(group)).await.unwrap();
        let row = cache.resolve(&tag(2, 2)).await.unwrap();
        assert_eq!((row.actor_owner, row.group_owner), (Some(actor), Some(group)));

        cache.update_actor_owner(&tag(2, 2), None).await.unwrap();
        assert!(cache.resolve(&tag(2, 2)).await.unwrap().is_unclaimed());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn writes_refresh_only_resident_cells() {
        let (cache, store, _) = cache();
        let actor = ActorId::new();
        cache.update_actor_owner(&tag(4, 4), Some(actor)).await.unwrap();
        assert!(!cache.is_resident(&tag(4, 4)));
        assert_eq!(cache.resident_count(), 0);
        assert_eq!(store.get(&tag(4, 4)).unwrap().actor_owner, Some(actor));

        assert_eq!(cache.resolve(&tag(4, 4)).await.unwrap().actor_owner, Some(actor));
        cache.update_actor_owner(&tag(4, 4), None).await.unwrap();
        assert!(cache.is_resident(&tag(4, 4)));
        assert!(cache.resolve(&tag(4, 4)).await.unwrap().is_unclaimed());
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn missing_group_is_remembered_until_unload() {
        let (cache, _, registry) = cache();
        let loner = ActorId::new();
        cache.update_actor_owner(&tag(6, 1), Some(loner)).await.unwrap();

        assert_eq!(cache.resolve(&tag(6, 1)).await.unwrap().group_owner, None);
        assert_eq!(cache.resolve(&tag(6, 1)).await.unwrap().group_owner, None);
        assert_eq!(registry.store().load_count(), 1);

        cache.cell_unloaded(&tag(6, 1));
        cache.resolve(&tag(6, 1)).await.unwrap();
        assert_eq!(registry.store().load_count(), 2);
    }

    #[tokio::test]
    async fn write_resets_a_remembered_derivation() {
        let (cache, _, registry) = cache();
        let founder = ActorId::new();
        cache.update_actor_owner(&tag(0, 5), Some(founder)).await.unwrap();
        assert_eq!(cache.resolve(&tag(0, 5)).await.unwrap().group_owner, None);

        let id = registry.create_group("Weir", founder).await.unwrap().group_id();
        assert_eq!(cache.resolve(&tag(0, 5)).await.unwrap().group_owner, None);

        cache.update_actor_owner(&tag(0, 5), Some(founder)).await.unwrap();
        assert_eq!(cache.resolve(&tag(0, 5)).await.unwrap().group_owner, Some(id));
    }

    #[tokio::test]
    async fn claim_unowned_takes_only_free_cells() {
        let (cache, store, _) = cache();
        let first = ActorId::new();
        let second = ActorId::new();
        cache.resolve(&tag(7, 7)).await.unwrap();

        assert_eq!(cache.claim_unowned(&tag(7, 7), first, None).await.unwrap(), None);
        assert_eq!(cache.resolve(&tag(7, 7)).await.unwrap().actor_owner, Some(first));

        let holder = cache.claim_unowned(&tag(7, 7), second, None).await.unwrap().unwrap();
        assert_eq!(holder.actor_owner, Some(first));
        assert_eq!(store.get(&tag(7, 7)).unwrap().actor_owner, Some(first));

        store.set_failing(true);
        let result = cache.claim_unowned(&tag(8, 8), second, None).await;
        assert!(matches!(result, Err(CoreError::CellStore(_))));
    }

    #[tokio::test]
    async fn mismatched_row_is_refused() {
        let (cache, store, _) = cache();
        let mut row = CellOwnership::unclaimed(tag(9, 9));
        row.actor_owner = Some(ActorId::new());
        store.insert_raw(tag(0, 0), row);

        let result = cache.resolve(&tag(0, 0)).await;
        assert!(matches!(result, Err(CoreError::CellMismatch { .. })));
        assert!(!cache.is_resident(&tag(0, 0)));
    }

    #[tokio::test]
    async fn failed_write_leaves_entry_untouched() {
        let (cache, store, _) = cache();
        cache.resolve(&tag(0, 0)).await.unwrap();
        store.set_failing(true);
        let result = cache.update_actor_owner(&tag(0, 0), Some(ActorId::new())).await;
        assert!(matches!(result, Err(CoreError::CellStore(_))));
        store.set_failing(false);
        assert!(cache.resolve(&tag(0, 0)).await.unwrap().is_unclaimed());
    }

    #[tokio::test]
    async fn range_probe_respects_radius_and_dimension() {
        let (cache, _, _) = cache();
        cache
            .update_actor_owner(&tag(5, -3), Some(ActorId::new()))
            .await
            .unwrap();

        assert!(cache.is_owned_by_anyone_within(&tag(3, -3), 2).await.unwrap());
        assert!(!cache.is_owned_by_anyone_within(&tag(3, -3), 1).await.unwrap());
        let nether = CellTag::new("nether", 5, -3);
        assert!(!cache.is_owned_by_anyone_within(&nether, 4).await.unwrap());
    }

    #[test]
    fn range_clamps_at_grid_edge() {
        let range = CellRange::around(&CellTag::new("overworld", i32::MAX, i32::MIN), u32::MAX);
        assert_eq!(range.max_x, i32::MAX);
        assert_eq!(range.min_z, i32::MIN);
        assert!(range.contains(&CellTag::new("overworld", 0, -1)));
        assert!(!range.contains(&CellTag::new("overworld", 0, 0)));
    }
}
