//! Claimant records: the mutable, dirty-tracked state of one owner.
//!
//! A [`Claimant`] is a cheap clonable handle to the single live record for
//! a [`ClaimantKey`]. [`Actor`] and [`Group`] are typed views over the same
//! handle that add the kind-specific membership operations.
//!
//! # Dirty tracking
//!
//! Every mutation that changes state bumps a revision and marks the record
//! dirty. The clean-to-dirty transition hands a strong reference to the
//! registry's dirty slot so the edit survives even if every external
//! handle is dropped before the next save. A save clears the flag only if
//! the revision it wrote is still current, then releases the slot.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::Utc;
use parcel_types::{
    ActorId, CellTag, ClaimantKey, ClaimantKind, ClaimantPayload, DimensionId, GroupId,
    MembershipPayload, Permission, Rank, Setting,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::registry::RegistryTable;
use crate::store::OwnerStore;

// ---------------------------------------------------------------------------
// Load state
// ---------------------------------------------------------------------------

/// Where a record is in its first load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Registered in the cache, store read in flight.
    Loading,
    /// Contents reflect the persisted payload (or a fresh actor).
    Ready,
    /// The load failed; the record was removed from the cache.
    Failed,
}

// ---------------------------------------------------------------------------
// Shared cell
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ClaimantState {
    payload: ClaimantPayload,
    dirty: bool,
    revision: u64,
}

/// The shared allocation behind every handle to one record.
#[derive(Debug)]
pub(crate) struct ClaimantCell {
    key: ClaimantKey,
    state: RwLock<ClaimantState>,
    load: watch::Sender<LoadState>,
    retired: AtomicBool,
    table: Weak<RegistryTable>,
}

impl ClaimantCell {
    /// A record registered ahead of its load, holding placeholder contents.
    pub(crate) fn loading(key: ClaimantKey, table: Weak<RegistryTable>) -> Self {
        let (load, _) = watch::channel(LoadState::Loading);
        Self {
            key,
            state: RwLock::new(ClaimantState {
                payload: blank_payload(key),
                dirty: false,
                revision: 0,
            }),
            load,
            retired: AtomicBool::new(false),
            table,
        }
    }

    /// A brand-new record that has never been persisted.
    pub(crate) fn created(payload: ClaimantPayload, table: Weak<RegistryTable>) -> Self {
        let (load, _) = watch::channel(LoadState::Ready);
        Self {
            key: payload.key(),
            state: RwLock::new(ClaimantState {
                payload,
                dirty: true,
                revision: 1,
            }),
            load,
            retired: AtomicBool::new(false),
            table,
        }
    }

    pub(crate) const fn key(&self) -> ClaimantKey {
        self.key
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.read().dirty
    }

    pub(crate) fn load_state(&self) -> LoadState {
        *self.load.borrow()
    }

    pub(crate) fn set_load_state(&self, state: LoadState) {
        self.load.send_replace(state);
    }

    /// Wait until the record leaves [`LoadState::Loading`].
    pub(crate) async fn settled(&self) -> LoadState {
        let mut receiver = self.load.subscribe();
        receiver
            .wait_for(|state| *state != LoadState::Loading)
            .await
            .map_or(LoadState::Failed, |state| *state)
    }

    /// Replace placeholder contents with a loaded payload.
    pub(crate) fn install(&self, payload: ClaimantPayload) {
        let mut state = self.write();
        state.payload = payload;
        state.dirty = false;
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    fn read(&self) -> RwLockReadGuard<'_, ClaimantState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClaimantState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Empty contents for a record whose load has not completed.
fn blank_payload(key: ClaimantKey) -> ClaimantPayload {
    let membership = match key.kind {
        ClaimantKind::Actor => MembershipPayload::Actor {
            group: None,
            pending_invites: BTreeSet::new(),
        },
        ClaimantKind::Group => MembershipPayload::Group {
            owner: ActorId(uuid::Uuid::nil()),
            members: BTreeSet::new(),
        },
    };
    ClaimantPayload {
        id: key.id,
        name: String::new(),
        registered_at: Utc::now(),
        friend_ranks: BTreeMap::new(),
        permission_requirements: BTreeMap::new(),
        cell_settings: BTreeMap::new(),
        owned_cells: BTreeSet::new(),
        membership,
    }
}

/// Contents of an actor with no persisted record.
pub(crate) fn fresh_actor(id: ActorId) -> ClaimantPayload {
    blank_payload(ClaimantKey::actor(id))
}

// ---------------------------------------------------------------------------
// Claimant handle
// ---------------------------------------------------------------------------

/// Handle to the single live record for one claimant.
///
/// Handles are cheap to clone. Mutations take `&self`; callers are expected
/// to serialise writers per record.
#[derive(Debug, Clone)]
pub struct Claimant {
    cell: Arc<ClaimantCell>,
}

impl Claimant {
    pub(crate) const fn from_cell(cell: Arc<ClaimantCell>) -> Self {
        Self { cell }
    }

    pub(crate) const fn cell(&self) -> &Arc<ClaimantCell> {
        &self.cell
    }

    /// Registry key.
    pub fn key(&self) -> ClaimantKey {
        self.cell.key()
    }

    /// Actor or group.
    pub fn kind(&self) -> ClaimantKind {
        self.cell.key().kind
    }

    /// Whether both handles point at the same live record.
    pub fn same_record(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Progress of the first load.
    pub fn load_state(&self) -> LoadState {
        self.cell.load_state()
    }

    /// Whether unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    /// Mutation counter, bumped on every effective change.
    pub fn revision(&self) -> u64 {
        self.cell.read().revision
    }

    /// A copy of the persisted shape of this record.
    pub fn snapshot(&self) -> ClaimantPayload {
        self.cell.read().payload.clone()
    }

    /// Typed actor view, if this is an actor.
    pub fn as_actor(&self) -> Option<Actor> {
        (self.kind() == ClaimantKind::Actor).then(|| Actor(self.clone()))
    }

    /// Typed group view, if this is a group.
    pub fn as_group(&self) -> Option<Group> {
        (self.kind() == ClaimantKind::Group).then(|| Group(self.clone()))
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// Stored display name, possibly empty.
    pub fn name(&self) -> String {
        self.cell.read().payload.name.clone()
    }

    /// Name for external renderers; falls back to the id.
    pub fn display_name(&self) -> String {
        let state = self.cell.read();
        if state.payload.name.is_empty() {
            state.payload.id.to_string()
        } else {
            state.payload.name.clone()
        }
    }

    /// Rename the claimant.
    pub fn set_name(&self, name: &str) -> bool {
        self.edit(|payload| {
            if payload.name == name {
                return false;
            }
            name.clone_into(&mut payload.name);
            true
        })
    }

    // -----------------------------------------------------------------------
    // Ranks
    // -----------------------------------------------------------------------

    /// Rank `actor` holds with respect to this claimant's cells.
    ///
    /// Unlisted actors hold [`Rank::BASELINE`]. A group's designated owner
    /// always holds [`Rank::Owner`].
    pub fn friend_rank(&self, actor: ActorId) -> Rank {
        let state = self.cell.read();
        let is_group_owner = matches!(
            &state.payload.membership,
            MembershipPayload::Group { owner, .. } if *owner == actor
        );
        if is_group_owner {
            return Rank::Owner;
        }
        state
            .payload
            .friend_ranks
            .get(&actor)
            .copied()
            .unwrap_or(Rank::BASELINE)
    }

    /// Every explicit rank relation.
    pub fn friends(&self) -> BTreeMap<ActorId, Rank> {
        self.cell.read().payload.friend_ranks.clone()
    }

    /// Set (`Some`) or remove (`None`) the rank of `actor`.
    ///
    /// Returns whether anything changed; an unchanged relation does not
    /// dirty the record.
    pub fn update_friend(&self, actor: ActorId, rank: Option<Rank>) -> bool {
        self.edit(|payload| match rank {
            Some(rank) => payload.friend_ranks.insert(actor, rank) != Some(rank),
            None => payload.friend_ranks.remove(&actor).is_some(),
        })
    }

    // -----------------------------------------------------------------------
    // Permission requirements and settings
    // -----------------------------------------------------------------------

    /// Rank required for `permission`, falling back to its default.
    pub fn permission_requirement(&self, permission: Permission) -> Rank {
        self.cell
            .read()
            .payload
            .permission_requirements
            .get(&permission)
            .copied()
            .unwrap_or_else(|| permission.default_requirement())
    }

    /// Override (`Some`) or reset (`None`) the rank required for `permission`.
    pub fn set_permission_requirement(&self, permission: Permission, rank: Option<Rank>) -> bool {
        self.edit(|payload| match rank {
            Some(rank) => payload.permission_requirements.insert(permission, rank) != Some(rank),
            None => payload.permission_requirements.remove(&permission).is_some(),
        })
    }

    /// Explicit value of `setting`, if one was set.
    pub fn setting(&self, setting: Setting) -> Option<bool> {
        self.cell.read().payload.cell_settings.get(&setting).copied()
    }

    /// Set (`Some`) or clear (`None`) an explicit setting value.
    pub fn set_setting(&self, setting: Setting, value: Option<bool>) -> bool {
        self.edit(|payload| match value {
            Some(value) => payload.cell_settings.insert(setting, value) != Some(value),
            None => payload.cell_settings.remove(&setting).is_some(),
        })
    }

    // -----------------------------------------------------------------------
    // Owned cells
    // -----------------------------------------------------------------------

    /// Snapshot of every owned cell.
    pub fn owned_cells(&self) -> BTreeSet<CellTag> {
        self.cell.read().payload.owned_cells.clone()
    }

    /// Owned cells in one dimension.
    pub fn owned_cells_in(&self, dimension: &DimensionId) -> Vec<CellTag> {
        self.cell
            .read()
            .payload
            .owned_cells
            .iter()
            .filter(|cell| &cell.dimension == dimension)
            .cloned()
            .collect()
    }

    /// Number of owned cells.
    pub fn owned_cell_count(&self) -> usize {
        self.cell.read().payload.owned_cells.len()
    }

    /// Whether `cell` is owned.
    pub fn owns(&self, cell: &CellTag) -> bool {
        self.cell.read().payload.owned_cells.contains(cell)
    }

    /// Add cells. Always dirties the record.
    pub fn add_cells(&self, cells: &[CellTag]) {
        self.edit(|payload| {
            payload.owned_cells.extend(cells.iter().cloned());
            true
        });
    }

    /// Remove cells. Always dirties the record.
    pub fn remove_cells(&self, cells: &[CellTag]) {
        self.edit(|payload| {
            for cell in cells {
                payload.owned_cells.remove(cell);
            }
            true
        });
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the record to `store` if it is dirty.
    ///
    /// Returns `Ok(true)` if a payload was written. On failure the record
    /// stays dirty and strongly held so a later pass retries.
    pub async fn save<S: OwnerStore>(&self, store: &S) -> Result<bool, RegistryError> {
        if self.cell.is_retired() {
            return Ok(false);
        }

        let pending = {
            let state = self.cell.read();
            state
                .dirty
                .then(|| (state.payload.clone(), state.revision))
        };
        let Some((payload, revision)) = pending else {
            self.release_hold();
            return Ok(false);
        };

        match store.save(&payload).await {
            Ok(()) => {
                let cleared = {
                    let mut state = self.cell.write();
                    let current = state.revision == revision;
                    if current {
                        state.dirty = false;
                    }
                    current
                };
                if cleared {
                    self.release_hold();
                }
                debug!(key = %self.key(), revision, cleared, "Saved claimant");
                Ok(true)
            }
            Err(err) => {
                warn!(key = %self.key(), error = %err, "Claimant save failed, keeping dirty");
                Err(err.into())
            }
        }
    }

    /// Apply `change`; if it reports a change, dirty the record.
    fn edit(&self, change: impl FnOnce(&mut ClaimantPayload) -> bool) -> bool {
        let became_dirty = {
            let mut state = self.cell.write();
            if !change(&mut state.payload) {
                return false;
            }
            state.revision = state.revision.saturating_add(1);
            !std::mem::replace(&mut state.dirty, true)
        };
        let table = (became_dirty && !self.cell.is_retired())
            .then(|| self.cell.table.upgrade())
            .flatten();
        if let Some(table) = table {
            table.hold(&self.cell);
        }
        true
    }

    fn release_hold(&self) {
        if let Some(table) = self.cell.table.upgrade() {
            table.release(&self.cell);
        }
    }

    fn membership(&self) -> MembershipPayload {
        self.cell.read().payload.membership.clone()
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

/// An individual claimant.
#[derive(Debug, Clone)]
pub struct Actor(Claimant);

impl core::ops::Deref for Actor {
    type Target = Claimant;

    fn deref(&self) -> &Claimant {
        &self.0
    }
}

impl Actor {
    /// The actor id.
    pub fn actor_id(&self) -> ActorId {
        ActorId(self.key().id)
    }

    /// The kind-agnostic handle.
    pub const fn claimant(&self) -> &Claimant {
        &self.0
    }

    /// The group this actor belongs to.
    pub fn group(&self) -> Option<GroupId> {
        match self.membership() {
            MembershipPayload::Actor { group, .. } => group,
            MembershipPayload::Group { .. } => None,
        }
    }

    /// Groups awaiting an answer from this actor.
    pub fn pending_invites(&self) -> BTreeSet<GroupId> {
        match self.membership() {
            MembershipPayload::Actor {
                pending_invites, ..
            } => pending_invites,
            MembershipPayload::Group { .. } => BTreeSet::new(),
        }
    }

    /// Whether `group` has an open invitation for this actor.
    pub fn has_invite(&self, group: GroupId) -> bool {
        self.pending_invites().contains(&group)
    }

    pub(crate) fn set_group(&self, to: Option<GroupId>) -> bool {
        self.edit(|payload| match &mut payload.membership {
            MembershipPayload::Actor { group, .. } if *group != to => {
                *group = to;
                true
            }
            _ => false,
        })
    }

    pub(crate) fn add_invite(&self, from: GroupId) -> bool {
        self.edit(|payload| match &mut payload.membership {
            MembershipPayload::Actor {
                pending_invites, ..
            } => pending_invites.insert(from),
            MembershipPayload::Group { .. } => false,
        })
    }

    pub(crate) fn remove_invite(&self, from: GroupId) -> bool {
        self.edit(|payload| match &mut payload.membership {
            MembershipPayload::Actor {
                pending_invites, ..
            } => pending_invites.remove(&from),
            MembershipPayload::Group { .. } => false,
        })
    }
}

/// A group claimant with one designated owner.
#[derive(Debug, Clone)]
pub struct Group(Claimant);

impl core::ops::Deref for Group {
    type Target = Claimant;

    fn deref(&self) -> &Claimant {
        &self.0
    }
}

impl Group {
    /// The group id.
    pub fn group_id(&self) -> GroupId {
        GroupId(self.key().id)
    }

    /// The kind-agnostic handle.
    pub const fn claimant(&self) -> &Claimant {
        &self.0
    }

    /// The designated owner.
    pub fn owner(&self) -> ActorId {
        match self.membership() {
            MembershipPayload::Group { owner, .. } => owner,
            MembershipPayload::Actor { .. } => ActorId(uuid::Uuid::nil()),
        }
    }

    /// Every member, the owner included.
    pub fn members(&self) -> BTreeSet<ActorId> {
        match self.membership() {
            MembershipPayload::Group { members, .. } => members,
            MembershipPayload::Actor { .. } => BTreeSet::new(),
        }
    }

    /// Whether `actor` is listed as a member.
    pub fn is_member(&self, actor: ActorId) -> bool {
        self.members().contains(&actor)
    }

    /// Make `actor` the designated owner.
    ///
    /// Also records [`Rank::Owner`] for the actor in the friend table and
    /// lists it as a member, so all three views agree.
    pub fn set_owner(&self, actor: ActorId) {
        self.edit(|payload| match &mut payload.membership {
            MembershipPayload::Group { owner, members } => {
                let changed = *owner != actor;
                *owner = actor;
                members.insert(actor) || changed
            }
            MembershipPayload::Actor { .. } => false,
        });
        self.update_friend(actor, Some(Rank::Owner));
    }

    pub(crate) fn add_member(&self, actor: ActorId) -> bool {
        self.edit(|payload| match &mut payload.membership {
            MembershipPayload::Group { members, .. } => members.insert(actor),
            MembershipPayload::Actor { .. } => false,
        })
    }

    pub(crate) fn remove_member(&self, actor: ActorId) -> bool {
        self.edit(|payload| match &mut payload.membership {
            MembershipPayload::Group { members, .. } => members.remove(&actor),
            MembershipPayload::Actor { .. } => false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::error::StoreError;
    use crate::registry::RegistryTable;
    use crate::store::MemoryOwnerStore;

    /// Store that edits a record while its save is in flight.
    #[derive(Default)]
    struct MeddlingStore {
        target: Mutex<Option<Claimant>>,
    }

    impl OwnerStore for MeddlingStore {
        async fn load(&self, _key: ClaimantKey) -> Result<Option<ClaimantPayload>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _payload: &ClaimantPayload) -> Result<(), StoreError> {
            let target = self.target.lock().unwrap().take();
            if let Some(claimant) = target {
                claimant.set_name("renamed mid-save");
            }
            Ok(())
        }

        async fn delete(&self, _key: ClaimantKey) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn detached(payload: ClaimantPayload) -> Claimant {
        Claimant::from_cell(Arc::new(ClaimantCell::created(payload, Weak::new())))
    }

    /// A loaded, clean actor not attached to any registry.
    fn ready_actor() -> Actor {
        let id = ActorId::new();
        let cell = ClaimantCell::loading(ClaimantKey::actor(id), Weak::new());
        cell.install(fresh_actor(id));
        Actor(Claimant::from_cell(Arc::new(cell)))
    }

    fn group_payload(owner: ActorId) -> ClaimantPayload {
        ClaimantPayload {
            membership: MembershipPayload::Group {
                owner,
                members: BTreeSet::from([owner]),
            },
            ..blank_payload(ClaimantKey::group(GroupId::new()))
        }
    }

    #[test]
    fn unlisted_actor_holds_baseline_rank() {
        let actor = ready_actor();
        assert_eq!(actor.friend_rank(ActorId::new()), Rank::BASELINE);
    }

    #[test]
    fn repeated_identical_update_dirties_once() {
        let actor = ready_actor();
        let friend = ActorId::new();
        assert!(!actor.is_dirty());

        assert!(actor.update_friend(friend, Some(Rank::Trusted)));
        let revision = actor.revision();
        assert!(actor.is_dirty());

        assert!(!actor.update_friend(friend, Some(Rank::Trusted)));
        assert_eq!(actor.revision(), revision);
        assert_eq!(actor.friend_rank(friend), Rank::Trusted);

        assert!(actor.update_friend(friend, None));
        assert!(!actor.update_friend(friend, None));
        assert_eq!(actor.friend_rank(friend), Rank::BASELINE);
    }

    #[test]
    fn requirement_falls_back_to_default() {
        let actor = ready_actor();
        assert_eq!(
            actor.permission_requirement(Permission::BreakBlocks),
            Permission::BreakBlocks.default_requirement()
        );
        assert!(actor.set_permission_requirement(Permission::BreakBlocks, Some(Rank::Friend)));
        assert_eq!(actor.permission_requirement(Permission::BreakBlocks), Rank::Friend);
        assert!(actor.set_permission_requirement(Permission::BreakBlocks, None));
        assert_eq!(
            actor.permission_requirement(Permission::BreakBlocks),
            Rank::Trusted
        );
    }

    #[test]
    fn cell_edits_always_dirty_and_never_duplicate() {
        let actor = ready_actor();
        let a = CellTag::new("overworld", 0, 0);
        let b = CellTag::new("overworld", 1, 0);

        actor.add_cells(&[a.clone(), b.clone(), a.clone()]);
        assert_eq!(actor.owned_cell_count(), 2);

        let revision = actor.revision();
        actor.add_cells(std::slice::from_ref(&a));
        assert!(actor.revision() > revision);
        assert_eq!(actor.owned_cell_count(), 2);

        actor.remove_cells(&[b.clone(), CellTag::new("nether", 0, 0)]);
        assert_eq!(actor.owned_cells(), BTreeSet::from([a]));
        assert!(!actor.owns(&b));
    }

    #[test]
    fn group_owner_always_holds_owner_rank() {
        let owner = ActorId::new();
        let group = Group(detached(group_payload(owner)));
        assert_eq!(group.friend_rank(owner), Rank::Owner);

        // Even an explicit lower entry cannot demote the designated owner.
        group.update_friend(owner, Some(Rank::Enemy));
        assert_eq!(group.friend_rank(owner), Rank::Owner);
    }

    #[test]
    fn set_owner_also_records_owner_rank() {
        let founder = ActorId::new();
        let group = Group(detached(group_payload(founder)));
        let heir = ActorId::new();

        group.set_owner(heir);
        assert_eq!(group.owner(), heir);
        assert!(group.is_member(heir));
        assert_eq!(group.friends().get(&heir), Some(&Rank::Owner));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let actor = ready_actor();
        assert_eq!(actor.display_name(), actor.key().id.to_string());
        assert!(actor.set_name("Ada"));
        assert!(!actor.set_name("Ada"));
        assert_eq!(actor.display_name(), "Ada");
    }

    #[test]
    fn typed_views_match_kind() {
        let actor = ready_actor();
        assert!(actor.as_group().is_none());
        assert!(actor.as_actor().is_some());
        let group = detached(group_payload(ActorId::new()));
        assert!(group.as_actor().is_none());
        assert_eq!(group.kind(), ClaimantKind::Group);
        assert_ne!(group.key().id, Uuid::nil());
    }

    #[tokio::test]
    async fn edit_during_save_keeps_record_dirty() {
        let table = Arc::new(RegistryTable::default());
        let claimant = Claimant::from_cell(Arc::new(ClaimantCell::created(
            fresh_actor(ActorId::new()),
            Arc::downgrade(&table),
        )));
        table.hold(claimant.cell());
        let store = MeddlingStore::default();
        *store.target.lock().unwrap() = Some(claimant.clone());

        assert!(matches!(claimant.save(&store).await, Ok(true)));
        assert!(claimant.is_dirty());
        assert!(table.is_held(claimant.key()));

        assert!(matches!(claimant.save(&store).await, Ok(true)));
        assert!(!claimant.is_dirty());
        assert!(!table.is_held(claimant.key()));
        assert_eq!(claimant.name(), "renamed mid-save");
    }

    #[tokio::test]
    async fn save_clears_dirty_only_after_success() {
        let table = Arc::new(RegistryTable::default());
        let cell = Arc::new(ClaimantCell::loading(
            ClaimantKey::actor(ActorId::new()),
            Arc::downgrade(&table),
        ));
        cell.install(fresh_actor(ActorId(cell.key().id)));
        let actor = Claimant::from_cell(cell);
        let store = MemoryOwnerStore::new();

        assert!(matches!(actor.save(&store).await, Ok(false)));
        actor.set_setting(Setting::Pvp, Some(true));
        assert!(table.is_held(actor.key()));

        store.set_fail_saves(true);
        assert!(actor.save(&store).await.is_err());
        assert!(actor.is_dirty());
        assert!(table.is_held(actor.key()));

        store.set_fail_saves(false);
        assert!(matches!(actor.save(&store).await, Ok(true)));
        assert!(!actor.is_dirty());
        assert!(!table.is_held(actor.key()));
        assert_eq!(
            store.get(actor.key()).map(|p| p.cell_settings),
            Some(BTreeMap::from([(Setting::Pvp, true)]))
        );
    }
}
