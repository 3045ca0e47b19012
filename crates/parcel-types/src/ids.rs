//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Actors and groups share the same UUID space in the persistent store but
//! are never interchangeable in the API: an [`ActorId`] cannot be passed
//! where a [`GroupId`] is expected. The registry addresses either kind
//! through a [`ClaimantKey`], which pairs the raw id with its kind.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::ClaimantKind;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an individual claimant (a player).
    ActorId
}

define_id! {
    /// Unique identifier for a group claimant (a town).
    GroupId
}

/// Registry key: the kind of claimant plus its raw identifier.
///
/// Persistent stores are keyed by this pair, and a loaded payload must carry
/// the same pair or the load is rejected as corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClaimantKey {
    /// Whether the id names an actor or a group.
    pub kind: ClaimantKind,
    /// The raw identifier.
    pub id: Uuid,
}

impl ClaimantKey {
    /// Key for an actor record.
    pub const fn actor(id: ActorId) -> Self {
        Self {
            kind: ClaimantKind::Actor,
            id: id.0,
        }
    }

    /// Key for a group record.
    pub const fn group(id: GroupId) -> Self {
        Self {
            kind: ClaimantKind::Group,
            id: id.0,
        }
    }

    /// The actor id, if this key names an actor.
    pub const fn as_actor(&self) -> Option<ActorId> {
        match self.kind {
            ClaimantKind::Actor => Some(ActorId(self.id)),
            ClaimantKind::Group => None,
        }
    }

    /// The group id, if this key names a group.
    pub const fn as_group(&self) -> Option<GroupId> {
        match self.kind {
            ClaimantKind::Group => Some(GroupId(self.id)),
            ClaimantKind::Actor => None,
        }
    }
}

impl From<ActorId> for ClaimantKey {
    fn from(id: ActorId) -> Self {
        Self::actor(id)
    }
}

impl From<GroupId> for ClaimantKey {
    fn from(id: GroupId) -> Self {
        Self::group(id)
    }
}

impl core::fmt::Display for ClaimantKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
