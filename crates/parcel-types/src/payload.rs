//! Persisted claimant payloads.
//!
//! A [`ClaimantPayload`] is what the registry hands to, and receives from,
//! the claimant store. The byte encoding is the store's concern; this module
//! only fixes the shape.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cell::CellTag;
use crate::enums::{ClaimantKind, Permission, Rank, Setting};
use crate::ids::{ActorId, ClaimantKey, GroupId};

/// Kind-specific part of a claimant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MembershipPayload {
    /// An individual claimant.
    Actor {
        /// The group this actor belongs to, if any.
        group: Option<GroupId>,
        /// Groups that have invited this actor and are awaiting an answer.
        #[serde(default)]
        pending_invites: BTreeSet<GroupId>,
    },
    /// A group claimant.
    Group {
        /// The designated owner.
        owner: ActorId,
        /// Actors who belong to the group, the owner included.
        #[serde(default)]
        members: BTreeSet<ActorId>,
    },
}

impl MembershipPayload {
    /// The claimant kind this membership describes.
    pub const fn kind(&self) -> ClaimantKind {
        match self {
            Self::Actor { .. } => ClaimantKind::Actor,
            Self::Group { .. } => ClaimantKind::Group,
        }
    }
}

/// Full persisted state of one claimant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimantPayload {
    /// Raw identifier; must match the key the payload is stored under.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// When the record was first created.
    pub registered_at: DateTime<Utc>,
    /// Explicit ranks granted to other actors.
    #[serde(default)]
    pub friend_ranks: BTreeMap<ActorId, Rank>,
    /// Per-permission rank overrides.
    #[serde(default)]
    pub permission_requirements: BTreeMap<Permission, Rank>,
    /// Per-setting overrides.
    #[serde(default)]
    pub cell_settings: BTreeMap<Setting, bool>,
    /// Every cell this claimant owns.
    #[serde(default)]
    pub owned_cells: BTreeSet<CellTag>,
    /// Kind-specific membership data.
    pub membership: MembershipPayload,
}

impl ClaimantPayload {
    /// The registry key this payload claims to belong to.
    pub const fn key(&self) -> ClaimantKey {
        ClaimantKey {
            kind: self.membership.kind(),
            id: self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> ClaimantPayload {
        let owner = ActorId::new();
        ClaimantPayload {
            id: Uuid::now_v7(),
            name: String::from("Riverside"),
            registered_at: Utc::now(),
            friend_ranks: BTreeMap::from([(owner, Rank::Owner)]),
            permission_requirements: BTreeMap::from([(Permission::Interact, Rank::Passive)]),
            cell_settings: BTreeMap::from([(Setting::Pvp, false)]),
            owned_cells: BTreeSet::from([CellTag::new("overworld", 0, 0)]),
            membership: MembershipPayload::Group {
                owner,
                members: BTreeSet::from([owner]),
            },
        }
    }

    #[test]
    fn key_is_derived_from_membership_kind() {
        let payload = sample_group();
        assert_eq!(payload.key(), ClaimantKey::group(GroupId(payload.id)));
    }

    #[test]
    fn payload_survives_json() {
        let payload = sample_group();
        let json = serde_json::to_string(&payload).unwrap_or_default();
        let back: Option<ClaimantPayload> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(payload));
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let id = Uuid::now_v7();
        let json = format!(
            r#"{{"id":"{id}","name":"Ada","registered_at":"2026-01-01T00:00:00Z","membership":{{"kind":"actor","group":null}}}}"#
        );
        let payload: Option<ClaimantPayload> = serde_json::from_str(&json).ok();
        let payload = payload.unwrap_or_else(|| sample_group());
        assert_eq!(payload.key(), ClaimantKey::actor(ActorId(id)));
        assert!(payload.owned_cells.is_empty());
        assert!(payload.friend_ranks.is_empty());
    }
}
