//! Permission and setting evaluation.
//!
//! Both functions are pure: the caller resolves the cell and looks up the
//! records involved, then asks. A denial is a `false` result, never an
//! error.

use parcel_registry::{Claimant, Group};
use parcel_types::{ActorId, CellOwnership, Permission, Setting};

use crate::config::SettingDefaults;

/// Whether `requester` may perform `permission` on `cell`.
///
/// `group` is the cell's resolved group, if any. `owner` is the record of
/// the cell's actor owner; without it only the unconditional grants apply.
///
/// Grants in order: unclaimed cells, the actor owner, the owner of the
/// cell's group, and finally anyone whose rank with the actor owner meets
/// that owner's requirement for `permission`.
pub fn can_perform(
    requester: ActorId,
    cell: &CellOwnership,
    group: Option<&Group>,
    owner: Option<&Claimant>,
    permission: Permission,
) -> bool {
    let Some(actor_owner) = cell.actor_owner else {
        return true;
    };
    if requester == actor_owner {
        return true;
    }
    if group.is_some_and(|group| group.owner() == requester) {
        return true;
    }
    owner.is_some_and(|owner| {
        owner.friend_rank(requester) >= owner.permission_requirement(permission)
    })
}

/// Whether `setting` is on for `cell`.
///
/// Group cells read the group's map, other claimed cells the actor
/// owner's. Unset values and unclaimed cells fall back to `defaults`.
pub fn is_setting_enabled(
    cell: &CellOwnership,
    group: Option<&Group>,
    owner: Option<&Claimant>,
    setting: Setting,
    defaults: &SettingDefaults,
) -> bool {
    if cell.is_unclaimed() {
        return defaults.wilderness(setting);
    }
    if let Some(group) = group {
        return group
            .setting(setting)
            .unwrap_or_else(|| defaults.group(setting));
    }
    if cell.group_owner.is_some() {
        return defaults.group(setting);
    }
    owner
        .and_then(|owner| owner.setting(setting))
        .unwrap_or_else(|| defaults.actor(setting))
}
