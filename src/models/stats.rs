//! Derived statistics models.

use serde::{Deserialize, Serialize};

use super::{EquipmentId, EquipmentKind, Mastery, MemberId};

/// Gear completion for a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GearProgress {
    /// Items still needed (stale references excluded)
    pub needed_count: u64,

    /// Catalog items considered owned, never negative
    pub owned_count: u64,

    /// Percentage of the catalog owned, 0..=100
    pub gear_progress: u32,
}

/// How many members currently need a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeededItemCount {
    pub id: EquipmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EquipmentKind,
    pub count: u32,
}

/// A leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: MemberId,
    pub name: Option<String>,
    pub image: Option<String>,
    pub cp: u64,
    pub mastery: Option<Mastery>,
    pub gear_progress: u32,
}

/// Guild-wide statistics document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildStats {
    pub total_members: u64,
    pub total_equipment: u64,
    pub avg_cp: u64,
    pub avg_progress: u32,
    pub most_needed: Vec<NeededItemCount>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl GuildStats {
    /// Stats for a guild with no onboarded members.
    pub fn empty(total_equipment: u64) -> Self {
        Self {
            total_members: 0,
            total_equipment,
            avg_cp: 0,
            avg_progress: 0,
            most_needed: Vec::new(),
            leaderboard: Vec::new(),
        }
    }
}
