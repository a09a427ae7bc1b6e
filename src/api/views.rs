//! Response shapes shared by several routes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    EquipmentSummary, GearProgress, Mastery, Member, MemberId, ResolvedMember, Role,
};
use crate::storage::{GuildStore, StoreError};

/// A gear-log entry with its equipment populated.
#[derive(Debug, Clone, Serialize)]
pub struct GearLogView {
    pub equipment: EquipmentSummary,
    pub quantity: u32,
}

/// A member profile as returned to clients.
///
/// The gear log only lists equipment that still exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: MemberId,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub cp: u64,
    pub mastery: Option<Mastery>,
    pub is_onboarded: bool,
    pub equipment_type: Option<String>,
    pub user_equipment_items: Vec<String>,
    pub user_equipment_accessories: Vec<String>,
    pub user_abilities: Vec<String>,
    pub user_mounts: Vec<String>,
    pub gear_log: Vec<GearLogView>,
    pub attendance_points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ResolvedMember> for MemberView {
    fn from(resolved: &ResolvedMember) -> Self {
        let m = &resolved.member;
        Self {
            id: m.id.clone(),
            email: m.email.clone(),
            name: m.name.clone(),
            image: m.image.clone(),
            role: m.role,
            cp: m.cp,
            mastery: m.mastery,
            is_onboarded: m.is_onboarded,
            equipment_type: m.equipment_type.clone(),
            user_equipment_items: m.user_equipment_items.clone(),
            user_equipment_accessories: m.user_equipment_accessories.clone(),
            user_abilities: m.user_abilities.clone(),
            user_mounts: m.user_mounts.clone(),
            gear_log: resolved
                .valid_gear()
                .map(|(summary, quantity)| GearLogView {
                    equipment: summary.clone(),
                    quantity,
                })
                .collect(),
            attendance_points: m.attendance_points,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// The public part of a profile shown on the roster. Contact details stay
/// private to the member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterProfile {
    pub id: MemberId,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub cp: u64,
    pub mastery: Option<Mastery>,
    pub equipment_type: Option<String>,
    pub user_equipment_items: Vec<String>,
    pub user_abilities: Vec<String>,
    pub user_mounts: Vec<String>,
    pub gear_log: Vec<GearLogView>,
    pub attendance_points: i64,
    pub created_at: DateTime<Utc>,
}

impl From<MemberView> for RosterProfile {
    fn from(view: MemberView) -> Self {
        Self {
            id: view.id,
            name: view.name,
            image: view.image,
            role: view.role,
            cp: view.cp,
            mastery: view.mastery,
            equipment_type: view.equipment_type,
            user_equipment_items: view.user_equipment_items,
            user_abilities: view.user_abilities,
            user_mounts: view.user_mounts,
            gear_log: view.gear_log,
            attendance_points: view.attendance_points,
            created_at: view.created_at,
        }
    }
}

impl From<&ResolvedMember> for RosterProfile {
    fn from(resolved: &ResolvedMember) -> Self {
        MemberView::from(resolved).into()
    }
}

/// A roster row: the public profile plus gear completion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithProgress {
    #[serde(flatten)]
    pub profile: RosterProfile,
    #[serde(flatten)]
    pub progress: GearProgress,
    pub total_equipment: u64,
}

/// Populated member reference: `{id, name, image}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub id: MemberId,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl From<&Member> for MemberSummary {
    fn from(m: &Member) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            image: m.image.clone(),
        }
    }
}

/// Populated author reference: `{id, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberName {
    pub id: MemberId,
    pub name: Option<String>,
}

impl From<&MemberSummary> for MemberName {
    fn from(s: &MemberSummary) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
        }
    }
}

/// Lookup table used to populate member references.
pub struct MemberDirectory(HashMap<MemberId, MemberSummary>);

impl MemberDirectory {
    pub async fn load(store: &dyn GuildStore) -> Result<Self, StoreError> {
        let members = store.list_members().await?;
        Ok(Self::from_members(&members))
    }

    pub fn from_members(members: &[Member]) -> Self {
        Self(
            members
                .iter()
                .map(|m| (m.id.clone(), MemberSummary::from(m)))
                .collect(),
        )
    }

    /// `None` when the member no longer exists.
    pub fn summary(&self, id: &MemberId) -> Option<MemberSummary> {
        self.0.get(id).cloned()
    }

    pub fn name(&self, id: &MemberId) -> Option<MemberName> {
        self.0.get(id).map(MemberName::from)
    }

    /// Populate a list of ids, dropping the ones that no longer resolve.
    pub fn summaries(&self, ids: &[MemberId]) -> Vec<MemberSummary> {
        ids.iter().filter_map(|id| self.summary(id)).collect()
    }
}
