//! Group lifecycle and membership operations.
//!
//! Both sides of a membership link are kept in step: the actor's `group`
//! field and the group's member list are edited together. Group deletion
//! never cascades; members and cells must be removed first.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use parcel_types::{ActorId, ClaimantKey, ClaimantPayload, GroupId, MembershipPayload, Rank};
use tracing::info;

use crate::claimant::Group;
use crate::error::RegistryError;
use crate::registry::RegistryCache;
use crate::store::OwnerStore;

impl<S: OwnerStore> RegistryCache<S> {
    /// Found a new group owned by `founder`.
    ///
    /// The founder must not already belong to a group. The new record is
    /// dirty until the next save pass.
    pub async fn create_group(&self, name: &str, founder: ActorId) -> Result<Group, RegistryError> {
        let actor = self.actor(founder).await?;
        if let Some(group) = actor.group() {
            return Err(RegistryError::AlreadyInGroup {
                actor: founder,
                group,
            });
        }

        let id = GroupId::new();
        let payload = ClaimantPayload {
            id: id.into_inner(),
            name: name.to_owned(),
            registered_at: Utc::now(),
            friend_ranks: BTreeMap::from([(founder, Rank::Owner)]),
            permission_requirements: BTreeMap::new(),
            cell_settings: BTreeMap::new(),
            owned_cells: BTreeSet::new(),
            membership: MembershipPayload::Group {
                owner: founder,
                members: BTreeSet::from([founder]),
            },
        };
        let group = self
            .insert_created(payload)
            .as_group()
            .ok_or(RegistryError::GroupNotFound(id))?;

        actor.set_group(Some(id));
        info!(group = %id, founder = %founder, name, "Group created");
        Ok(group)
    }

    /// Invite `actor` to `group`. Returns `false` if already invited.
    pub async fn invite(&self, group: GroupId, actor: ActorId) -> Result<bool, RegistryError> {
        self.group(group).await?;
        let record = self.actor(actor).await?;
        if record.group() == Some(group) {
            return Err(RegistryError::AlreadyInGroup { actor, group });
        }
        Ok(record.add_invite(group))
    }

    /// Accept a pending invitation and join the group.
    pub async fn accept_invite(&self, actor: ActorId, group: GroupId) -> Result<(), RegistryError> {
        let record = self.actor(actor).await?;
        if !record.has_invite(group) {
            return Err(RegistryError::NoPendingInvite { actor, group });
        }
        if let Some(current) = record.group() {
            return Err(RegistryError::AlreadyInGroup {
                actor,
                group: current,
            });
        }

        let target = match self.group(group).await {
            Ok(target) => target,
            Err(err) => {
                // A dangling invitation is useless either way.
                record.remove_invite(group);
                return Err(err);
            }
        };

        record.remove_invite(group);
        record.set_group(Some(group));
        target.add_member(actor);
        info!(group = %group, actor = %actor, "Actor joined group");
        Ok(())
    }

    /// Decline a pending invitation. Returns `false` if there was none.
    pub async fn decline_invite(&self, actor: ActorId, group: GroupId) -> Result<bool, RegistryError> {
        Ok(self.actor(actor).await?.remove_invite(group))
    }

    /// Leave the actor's current group. The owner cannot leave.
    ///
    /// Returns the group that was left.
    pub async fn leave_group(&self, actor: ActorId) -> Result<GroupId, RegistryError> {
        let record = self.actor(actor).await?;
        let group = record.group().ok_or(RegistryError::NotInAGroup(actor))?;

        match self.group(group).await {
            Ok(target) => {
                if target.owner() == actor {
                    return Err(RegistryError::OwnerCannotLeave { actor, group });
                }
                target.remove_member(actor);
                target.update_friend(actor, None);
            }
            Err(RegistryError::GroupNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        record.set_group(None);
        info!(group = %group, actor = %actor, "Actor left group");
        Ok(group)
    }

    /// Hand ownership of `group` to one of its members.
    ///
    /// The previous owner stays a member and is demoted to
    /// [`Rank::Officer`].
    pub async fn transfer_group(&self, group: GroupId, new_owner: ActorId) -> Result<(), RegistryError> {
        let target = self.group(group).await?;
        if !target.is_member(new_owner) {
            return Err(RegistryError::NotAMember {
                actor: new_owner,
                group,
            });
        }
        let previous = target.owner();
        if previous == new_owner {
            return Ok(());
        }

        target.set_owner(new_owner);
        target.update_friend(previous, Some(Rank::Officer));
        info!(group = %group, from = %previous, to = %new_owner, "Group ownership transferred");
        Ok(())
    }

    /// Delete a group that has no members besides its owner and no cells.
    ///
    /// The owner's link is cleared and the persisted record removed.
    pub async fn delete_group(&self, group: GroupId) -> Result<(), RegistryError> {
        let target = self.group(group).await?;
        let owner = target.owner();

        let remaining = target
            .members()
            .into_iter()
            .filter(|member| *member != owner)
            .count();
        if remaining > 0 {
            return Err(RegistryError::GroupHasMembers { group, remaining });
        }
        let cells = target.owned_cell_count();
        if cells > 0 {
            return Err(RegistryError::GroupStillOwnsCells { group, cells });
        }

        self.store().delete(ClaimantKey::group(group)).await?;
        self.retire(target.claimant());

        let founder = self.actor(owner).await?;
        if founder.group() == Some(group) {
            founder.set_group(None);
        }
        info!(group = %group, "Group deleted");
        Ok(())
    }
}
