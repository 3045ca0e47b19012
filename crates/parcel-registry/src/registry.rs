//! Process-wide registry of live claimant records.
//!
//! Each key maps to a two-slot entry:
//!
//! - a **weak slot** that finds a record still referenced elsewhere, so a
//!   second lookup never constructs a duplicate instance, and
//! - a **dirty slot** that strongly holds a record from the moment it is
//!   dirtied until a save succeeds, so unsaved edits outlive every external
//!   handle.
//!
//! An entry is evictable once the dirty slot is empty and the weak slot is
//! dead. [`RegistryCache::sweep`] saves first and then prunes, which is the
//! explicit replacement for a last-chance save on drop.
//!
//! # Loading
//!
//! A missing record is registered in the `Loading` state *before* the store
//! is read. A top-level lookup that finds a record in that state waits for
//! it to settle. A nested lookup (made while another load is in flight,
//! such as a group checking its members during its own load) gets the
//! in-progress handle back immediately instead of waiting, which rules out
//! both infinite recursion and cross-record deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::BoxFuture;
use parcel_types::{ActorId, ClaimantKey, ClaimantKind, ClaimantPayload, GroupId};
use tracing::{debug, error, info, warn};

use crate::claimant::{Actor, Claimant, ClaimantCell, Group, LoadState, fresh_actor};
use crate::error::RegistryError;
use crate::store::OwnerStore;

// ---------------------------------------------------------------------------
// Slot table
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Entry {
    weak: Weak<ClaimantCell>,
    dirty: Option<Arc<ClaimantCell>>,
}

impl Entry {
    fn live(&self) -> Option<Arc<ClaimantCell>> {
        self.dirty.clone().or_else(|| self.weak.upgrade())
    }

    fn is_evictable(&self) -> bool {
        self.dirty.is_none() && self.weak.strong_count() == 0
    }
}

/// The shared entry map. Records keep a weak back-reference to it.
#[derive(Debug, Default)]
pub(crate) struct RegistryTable {
    entries: Mutex<HashMap<ClaimantKey, Entry>>,
}

impl RegistryTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<ClaimantKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `cell` in its dirty slot.
    pub(crate) fn hold(&self, cell: &Arc<ClaimantCell>) {
        let mut entries = self.lock();
        let entry = entries.entry(cell.key()).or_insert_with(|| Entry {
            weak: Arc::downgrade(cell),
            dirty: None,
        });
        // A different live instance under the same key is never replaced.
        if entry.weak.upgrade().is_some_and(|live| !Arc::ptr_eq(&live, cell)) {
            return;
        }
        entry.weak = Arc::downgrade(cell);
        entry.dirty = Some(Arc::clone(cell));
    }

    /// Empty the dirty slot if `cell` is in it and is clean.
    ///
    /// The dirty flag is read under the table lock so a concurrent edit
    /// that re-dirties the record is never released.
    pub(crate) fn release(&self, cell: &Arc<ClaimantCell>) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(&cell.key()) {
            let holds_cell = entry.dirty.as_ref().is_some_and(|held| Arc::ptr_eq(held, cell));
            if holds_cell && !cell.is_dirty() {
                entry.dirty = None;
            }
        }
    }

    /// Strong handles to every record in a dirty slot.
    fn held(&self) -> Vec<Arc<ClaimantCell>> {
        self.lock()
            .values()
            .filter_map(|entry| entry.dirty.clone())
            .collect()
    }

    /// Remove the entry for `cell` if it is still the registered instance.
    fn forget(&self, cell: &Arc<ClaimantCell>) {
        let mut entries = self.lock();
        let registered = entries
            .get(&cell.key())
            .is_some_and(|entry| std::ptr::eq(entry.weak.as_ptr(), Arc::as_ptr(cell)));
        if registered {
            entries.remove(&cell.key());
        }
    }

    /// Drop every evictable entry; returns how many were removed.
    fn prune(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_evictable());
        before.saturating_sub(entries.len())
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self, key: ClaimantKey) -> bool {
        self.lock().get(&key).is_some_and(|entry| entry.dirty.is_some())
    }
}

/// Fails an in-flight load unless it is disarmed.
///
/// Covers both an error return and the loading future being dropped, so
/// waiters never see a slot stuck in `Loading`.
struct LoadGuard<'a> {
    table: &'a RegistryTable,
    cell: &'a Arc<ClaimantCell>,
    armed: bool,
}

impl<'a> LoadGuard<'a> {
    const fn arm(table: &'a RegistryTable, cell: &'a Arc<ClaimantCell>) -> Self {
        Self {
            table,
            cell,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cell.retire();
            self.table.forget(self.cell);
            self.cell.set_load_state(LoadState::Failed);
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of one save pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records written to the store.
    pub saved: usize,
    /// Records whose save failed; they stay dirty.
    pub failed: usize,
}

/// Outcome of one save-then-evict pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records written to the store.
    pub saved: usize,
    /// Records whose save failed; they stay dirty and cached.
    pub failed: usize,
    /// Entries removed because they were clean and unreferenced.
    pub evicted: usize,
}

/// Whether a lookup may wait for an in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    /// Called from outside any load; waits for the record to settle.
    TopLevel,
    /// Called while another load is in flight; never waits.
    Nested,
}

// ---------------------------------------------------------------------------
// RegistryCache
// ---------------------------------------------------------------------------

/// Process-wide map from [`ClaimantKey`] to the single live record.
#[derive(Debug)]
pub struct RegistryCache<S> {
    table: Arc<RegistryTable>,
    store: Arc<S>,
}

impl<S> Clone for RegistryCache<S> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: OwnerStore> RegistryCache<S> {
    /// Create an empty registry over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            table: Arc::new(RegistryTable::default()),
            store,
        }
    }

    /// The backing claimant store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The single live record for `key`, loading it on first access.
    ///
    /// Actors with no persisted record are created empty. Groups with no
    /// persisted record yield [`RegistryError::GroupNotFound`].
    pub async fn get_or_load(&self, key: ClaimantKey) -> Result<Claimant, RegistryError> {
        self.lookup(key, Lookup::TopLevel).await
    }

    /// Typed lookup of an actor.
    pub async fn actor(&self, id: ActorId) -> Result<Actor, RegistryError> {
        let key = ClaimantKey::actor(id);
        self.get_or_load(key).await?.as_actor().ok_or(RegistryError::WrongKind {
            key,
            expected: ClaimantKind::Actor,
        })
    }

    /// Typed lookup of a group.
    pub async fn group(&self, id: GroupId) -> Result<Group, RegistryError> {
        let key = ClaimantKey::group(id);
        self.get_or_load(key).await?.as_group().ok_or(RegistryError::WrongKind {
            key,
            expected: ClaimantKind::Group,
        })
    }

    /// The live record for `key` without loading it.
    pub fn cached(&self, key: ClaimantKey) -> Option<Claimant> {
        self.table
            .lock()
            .get(&key)
            .and_then(Entry::live)
            .map(Claimant::from_cell)
    }

    /// Whether `key` has a live record.
    pub fn is_cached(&self, key: ClaimantKey) -> bool {
        self.cached(key).is_some()
    }

    /// Number of entries currently in the table, evictable ones included.
    pub fn entry_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Number of records held by their dirty slot.
    pub fn dirty_count(&self) -> usize {
        self.table.held().len()
    }

    /// Log the registry size.
    pub fn log_stats(&self) {
        info!(
            entries = self.entry_count(),
            dirty = self.dirty_count(),
            "Claimant registry"
        );
    }

    /// Save every record held by a dirty slot.
    pub async fn flush_dirty(&self) -> FlushReport {
        let mut report = FlushReport::default();
        for cell in self.table.held() {
            match Claimant::from_cell(cell).save(self.store.as_ref()).await {
                Ok(true) => report.saved = report.saved.saturating_add(1),
                Ok(false) => {}
                Err(_) => report.failed = report.failed.saturating_add(1),
            }
        }
        if report.saved > 0 || report.failed > 0 {
            debug!(saved = report.saved, failed = report.failed, "Flushed dirty claimants");
        }
        report
    }

    /// Save dirty records, then evict entries that are clean and unreferenced.
    pub async fn sweep(&self) -> SweepReport {
        let flushed = self.flush_dirty().await;
        let evicted = self.table.prune();
        if evicted > 0 {
            debug!(evicted, remaining = self.entry_count(), "Swept claimant registry");
        }
        SweepReport {
            saved: flushed.saved,
            failed: flushed.failed,
            evicted,
        }
    }

    /// Register a record that has never been persisted. It starts dirty.
    pub(crate) fn insert_created(&self, payload: ClaimantPayload) -> Claimant {
        let cell = Arc::new(ClaimantCell::created(payload, Arc::downgrade(&self.table)));
        self.table.hold(&cell);
        Claimant::from_cell(cell)
    }

    /// Drop a record from the registry for good.
    pub(crate) fn retire(&self, claimant: &Claimant) {
        claimant.cell().retire();
        self.table.forget(claimant.cell());
    }

    // -----------------------------------------------------------------------
    // Load path
    // -----------------------------------------------------------------------

    fn lookup(&self, key: ClaimantKey, mode: Lookup) -> BoxFuture<'_, Result<Claimant, RegistryError>> {
        Box::pin(async move {
            loop {
                let (cell, registered) = self.claim_slot(key);
                if registered {
                    let guard = LoadGuard::arm(&self.table, &cell);
                    self.load_into(&cell).await?;
                    guard.disarm();
                    return Ok(Claimant::from_cell(cell));
                }

                let state = match (cell.load_state(), mode) {
                    (LoadState::Loading, Lookup::Nested) => LoadState::Loading,
                    (LoadState::Loading, Lookup::TopLevel) => cell.settled().await,
                    (state, _) => state,
                };
                match (state, mode) {
                    // The failed record is already forgotten; the next pass
                    // registers a fresh slot and loads it here.
                    (LoadState::Failed, Lookup::TopLevel) => {
                        debug!(key = %key, "Load abandoned by another caller, retrying");
                    }
                    (LoadState::Failed, Lookup::Nested) => return Err(RegistryError::LoadAborted(key)),
                    (LoadState::Ready | LoadState::Loading, _) => return Ok(Claimant::from_cell(cell)),
                }
            }
        })
    }

    /// Find the live record, or register a new one in the `Loading` state.
    ///
    /// The boolean is `true` when the caller registered it and must load it.
    fn claim_slot(&self, key: ClaimantKey) -> (Arc<ClaimantCell>, bool) {
        let mut entries = self.table.lock();
        if let Some(cell) = entries.get(&key).and_then(Entry::live) {
            return (cell, false);
        }
        let cell = Arc::new(ClaimantCell::loading(key, Arc::downgrade(&self.table)));
        entries.insert(
            key,
            Entry {
                weak: Arc::downgrade(&cell),
                dirty: None,
            },
        );
        (cell, true)
    }

    async fn load_into(&self, cell: &Arc<ClaimantCell>) -> Result<(), RegistryError> {
        let key = cell.key();
        let loaded = match self.store.load(key).await {
            Ok(Some(payload)) if payload.key() == key => Ok(payload),
            Ok(Some(payload)) => {
                error!(
                    expected = %key,
                    found = %payload.key(),
                    "Persisted claimant does not match its key, aborting load"
                );
                Err(RegistryError::IdentityMismatch {
                    expected: key,
                    found: payload.key(),
                })
            }
            Ok(None) => match key.kind {
                ClaimantKind::Actor => Ok(fresh_actor(ActorId(key.id))),
                ClaimantKind::Group => Err(RegistryError::GroupNotFound(GroupId(key.id))),
            },
            Err(err) => Err(err.into()),
        };

        cell.install(loaded?);
        self.refresh_membership(&Claimant::from_cell(Arc::clone(cell))).await;
        cell.set_load_state(LoadState::Ready);
        debug!(key = %key, "Loaded claimant");
        Ok(())
    }

    /// Repair membership links that point at records which disagree.
    ///
    /// Records reached here that are still loading are skipped; their own
    /// refresh checks the link from the other side.
    async fn refresh_membership(&self, claimant: &Claimant) {
        if let Some(group) = claimant.as_group() {
            for member in group.members() {
                if member == group.owner() {
                    continue;
                }
                let Ok(record) = self.lookup(ClaimantKey::actor(member), Lookup::Nested).await else {
                    continue;
                };
                let Some(actor) = record.as_actor() else {
                    continue;
                };
                if actor.load_state() == LoadState::Ready && actor.group() != Some(group.group_id()) {
                    warn!(group = %group.group_id(), actor = %member, "Dropping stale group member");
                    group.remove_member(member);
                }
            }
        } else if let Some(actor) = claimant.as_actor() {
            let Some(group_id) = actor.group() else {
                return;
            };
            match self.lookup(ClaimantKey::group(group_id), Lookup::Nested).await {
                Err(RegistryError::GroupNotFound(_)) => {
                    warn!(actor = %actor.actor_id(), group = %group_id, "Clearing link to missing group");
                    actor.set_group(None);
                }
                Ok(record) => {
                    let Some(group) = record.as_group() else {
                        return;
                    };
                    if group.load_state() == LoadState::Ready && !group.is_member(actor.actor_id()) {
                        warn!(actor = %actor.actor_id(), group = %group_id, "Clearing link to group that dropped actor");
                        actor.set_group(None);
                    }
                }
                Err(_) => {}
            }
        }
    }
}
