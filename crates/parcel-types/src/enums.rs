//! Enumeration types for the Parcel claim system.
//!
//! [`Rank`] is the trust ladder an actor holds with respect to a claimant.
//! [`Permission`] names a gated action and carries its hard-coded default
//! requirement. [`Setting`] names a per-claimant boolean toggle whose
//! defaults are external configuration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Claimant kinds
// ---------------------------------------------------------------------------

/// The two concrete kinds of claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClaimantKind {
    /// An individual claimant (a player).
    Actor,
    /// A group of actors with one designated owner (a town).
    Group,
}

impl ClaimantKind {
    /// Lowercase name used in store keys and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Group => "group",
        }
    }
}

// ---------------------------------------------------------------------------
// Ranks
// ---------------------------------------------------------------------------

/// Trust level an actor holds with respect to a claimant's cells.
///
/// Declaration order is the total order: `Enemy` is minimal and `Owner`
/// is maximal. Access is granted iff the held rank is greater than or
/// equal to the required rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Rank {
    /// Explicitly distrusted.
    Enemy,
    /// Baseline for anyone without an explicit relation.
    Passive,
    /// Casual trust: may interact with doors, buttons and mounts.
    Friend,
    /// May build, break and open containers.
    Trusted,
    /// May manage other actors' ranks and the claimant's settings.
    Officer,
    /// The claimant itself (or a group's designated owner).
    Owner,
}

impl Rank {
    /// Rank returned for an actor with no recorded relation.
    pub const BASELINE: Self = Self::Passive;
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// A named action inside a claimed cell, gated by a required [`Rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Permission {
    /// Breaking blocks.
    BreakBlocks,
    /// Placing blocks.
    PlaceBlocks,
    /// Using doors, levers, buttons and similar.
    Interact,
    /// Opening chests, barrels and other containers.
    OpenContainers,
    /// Mounting entities.
    RideEntities,
    /// Damaging non-hostile entities.
    AttackEntities,
    /// Changing ranks, requirements and settings.
    ManageClaim,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::BreakBlocks,
        Self::PlaceBlocks,
        Self::Interact,
        Self::OpenContainers,
        Self::RideEntities,
        Self::AttackEntities,
        Self::ManageClaim,
    ];

    /// Requirement used when a claimant has not configured this permission.
    pub const fn default_requirement(self) -> Rank {
        match self {
            Self::Interact | Self::RideEntities => Rank::Friend,
            Self::BreakBlocks
            | Self::PlaceBlocks
            | Self::OpenContainers
            | Self::AttackEntities => Rank::Trusted,
            Self::ManageClaim => Rank::Officer,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// A per-claimant boolean toggle affecting cell behavior.
///
/// Settings are independent of who is asking; unset values fall back to a
/// default table supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Setting {
    /// Explosions may destroy blocks.
    Explosions,
    /// Fire may spread and burn blocks.
    FireSpread,
    /// Hostile mobs may spawn naturally.
    MobSpawning,
    /// Mobs may alter blocks (endermen, creepers, farmland trampling).
    MobGriefing,
    /// Actors may damage each other.
    Pvp,
}

impl Setting {
    /// Every setting, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Explosions,
        Self::FireSpread,
        Self::MobSpawning,
        Self::MobGriefing,
        Self::Pvp,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_order_is_total_and_bounded() {
        let ladder = [
            Rank::Enemy,
            Rank::Passive,
            Rank::Friend,
            Rank::Trusted,
            Rank::Officer,
            Rank::Owner,
        ];
        for pair in ladder.windows(2) {
            if let [lower, higher] = pair {
                assert!(lower < higher);
            }
        }
        assert_eq!(ladder.iter().max(), Some(&Rank::Owner));
        assert_eq!(ladder.iter().min(), Some(&Rank::Enemy));
    }

    #[test]
    fn baseline_sits_above_enemy() {
        assert!(Rank::BASELINE > Rank::Enemy);
        assert!(Rank::BASELINE < Rank::Friend);
    }

    #[test]
    fn every_default_requirement_is_above_baseline() {
        for perm in Permission::ALL {
            assert!(perm.default_requirement() > Rank::BASELINE, "{perm:?}");
        }
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&Permission::OpenContainers).unwrap_or_default();
        assert_eq!(json, "\"open_containers\"");
        let json = serde_json::to_string(&Setting::MobGriefing).unwrap_or_default();
        assert_eq!(json, "\"mob_griefing\"");
    }
}
