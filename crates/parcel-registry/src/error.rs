//! Error types for the parcel-registry crate.
//!
//! Permission denials are never errors; everything here is either a
//! missing record, corrupt persisted data, a violated membership
//! precondition, or a store failure.

use parcel_types::{ActorId, ClaimantKey, ClaimantKind, GroupId};

/// Failures reported by a claimant store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached or rejected the request.
    #[error("claimant store unavailable: {0}")]
    Unavailable(String),

    /// A stored payload could not be decoded.
    #[error("corrupt claimant payload: {0}")]
    Corrupt(String),
}

/// Errors that can occur during registry and membership operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No group is persisted under this id. Groups are never auto-created.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    /// A persisted payload names a different claimant than the key it was
    /// loaded under. The load is aborted.
    #[error("identity mismatch: loaded {found} under key {expected}")]
    IdentityMismatch {
        /// The key the payload was requested under.
        expected: ClaimantKey,
        /// The key embedded in the payload.
        found: ClaimantKey,
    },

    /// Another caller's load of this record failed while we waited on it.
    #[error("load of {0} was aborted")]
    LoadAborted(ClaimantKey),

    /// A handle of one kind was requested for a key of another.
    #[error("{key} is not a {}", expected.as_str())]
    WrongKind {
        /// The key that was looked up.
        key: ClaimantKey,
        /// The kind the caller asked for.
        expected: ClaimantKind,
    },

    /// The actor already belongs to a group.
    #[error("actor {actor} already belongs to group {group}")]
    AlreadyInGroup {
        /// The actor.
        actor: ActorId,
        /// The group it belongs to.
        group: GroupId,
    },

    /// The actor does not belong to any group.
    #[error("actor {0} is not in a group")]
    NotInAGroup(ActorId),

    /// The actor is not a member of the named group.
    #[error("actor {actor} is not a member of group {group}")]
    NotAMember {
        /// The actor.
        actor: ActorId,
        /// The group.
        group: GroupId,
    },

    /// The actor holds no invitation from the group.
    #[error("actor {actor} has no pending invite from group {group}")]
    NoPendingInvite {
        /// The actor.
        actor: ActorId,
        /// The group.
        group: GroupId,
    },

    /// A group's owner must transfer ownership before leaving.
    #[error("actor {actor} owns group {group} and cannot leave it")]
    OwnerCannotLeave {
        /// The owner.
        actor: ActorId,
        /// The owned group.
        group: GroupId,
    },

    /// Members other than the owner must be removed before deletion.
    #[error("group {group} still has {remaining} member(s) besides its owner")]
    GroupHasMembers {
        /// The group.
        group: GroupId,
        /// Members left, owner excluded.
        remaining: usize,
    },

    /// Cells must be unclaimed before deletion.
    #[error("group {group} still owns {cells} cell(s)")]
    GroupStillOwnsCells {
        /// The group.
        group: GroupId,
        /// Cells still owned.
        cells: usize,
    },

    /// The claimant store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
