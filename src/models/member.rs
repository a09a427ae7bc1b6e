//! Guild member model and gear-log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::{EntityId, EquipmentId, EquipmentKind, EquipmentSummary, MemberId};

/// Member role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Weapon mastery a member plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mastery {
    #[serde(rename = "Sword and Shield")]
    SwordAndShield,
    #[serde(rename = "Battle Shield")]
    BattleShield,
    #[serde(rename = "Staff")]
    Staff,
    #[serde(rename = "Battle Staff")]
    BattleStaff,
    #[serde(rename = "Bow")]
    Bow,
    #[serde(rename = "Crossbow")]
    Crossbow,
    #[serde(rename = "Greatsword")]
    Greatsword,
    #[serde(rename = "Dual Dagger")]
    DualDagger,
}

impl Mastery {
    pub const ALL: [Mastery; 8] = [
        Mastery::SwordAndShield,
        Mastery::BattleShield,
        Mastery::Staff,
        Mastery::BattleStaff,
        Mastery::Bow,
        Mastery::Crossbow,
        Mastery::Greatsword,
        Mastery::DualDagger,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mastery::SwordAndShield => "Sword and Shield",
            Mastery::BattleShield => "Battle Shield",
            Mastery::Staff => "Staff",
            Mastery::BattleStaff => "Battle Staff",
            Mastery::Bow => "Bow",
            Mastery::Crossbow => "Crossbow",
            Mastery::Greatsword => "Greatsword",
            Mastery::DualDagger => "Dual Dagger",
        }
    }

    /// Parse a mastery label (exact label, surrounding whitespace ignored).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Mastery::ALL.into_iter().find(|m| m.label() == s)
    }
}

impl std::fmt::Display for Mastery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored mastery values may be empty strings for members who never chose
/// one. Unrecognised labels read as no mastery so the member stays loadable.
fn deserialize_optional_mastery<'de, D>(deserializer: D) -> Result<Option<Mastery>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => {
            let mastery = Mastery::parse(label);
            if mastery.is_none() {
                warn!("Ignoring unknown stored mastery {:?}", label);
            }
            Ok(mastery)
        }
    }
}

/// An equipment reference as it may arrive from a client: a bare id or a
/// populated object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EquipmentRefInput {
    Id(EquipmentId),
    Object {
        #[serde(alias = "_id")]
        id: EquipmentId,
    },
}

impl EquipmentRefInput {
    fn into_id(self) -> EquipmentId {
        match self {
            EquipmentRefInput::Id(id) | EquipmentRefInput::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum GearLogInput {
    Entry {
        equipment: EquipmentRefInput,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    Bare(EquipmentRefInput),
}

fn default_quantity() -> u32 {
    1
}

/// A needed-gear entry as stored on the member document.
///
/// Every accepted input shape collapses into this one at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GearLogInput")]
pub struct GearLogRecord {
    pub equipment: EquipmentId,
    pub quantity: u32,
}

impl GearLogRecord {
    pub fn new(equipment: EquipmentId) -> Self {
        Self {
            equipment,
            quantity: 1,
        }
    }
}

impl From<GearLogInput> for GearLogRecord {
    fn from(input: GearLogInput) -> Self {
        match input {
            GearLogInput::Entry {
                equipment,
                quantity,
            } => Self {
                equipment: equipment.into_id(),
                quantity,
            },
            GearLogInput::Bare(equipment) => Self::new(equipment.into_id()),
        }
    }
}

/// A gear-log reference after it has been checked against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentRef {
    Resolved(EquipmentSummary),
    /// The referenced equipment no longer exists.
    Dangling(EquipmentId),
}

impl EquipmentRef {
    pub fn id(&self) -> &EquipmentId {
        match self {
            EquipmentRef::Resolved(summary) => &summary.id,
            EquipmentRef::Dangling(id) => id,
        }
    }

    pub fn resolved(&self) -> Option<&EquipmentSummary> {
        match self {
            EquipmentRef::Resolved(summary) => Some(summary),
            EquipmentRef::Dangling(_) => None,
        }
    }

    pub fn is_dangling(&self) -> bool {
        matches!(self, EquipmentRef::Dangling(_))
    }
}

/// A resolved gear-log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeededGear {
    pub equipment: EquipmentRef,
    pub quantity: u32,
}

impl NeededGear {
    pub fn resolved(id: &str, name: &str, kind: EquipmentKind) -> Self {
        Self {
            equipment: EquipmentRef::Resolved(EquipmentSummary {
                id: id.into(),
                name: name.to_string(),
                kind,
            }),
            quantity: 1,
        }
    }

    pub fn dangling(id: &str) -> Self {
        Self {
            equipment: EquipmentRef::Dangling(id.into()),
            quantity: 1,
        }
    }
}

/// A guild member document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,

    /// Lowercased, trimmed email (unique)
    pub email: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Avatar reference
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// Combat power
    #[serde(default)]
    pub cp: u64,

    #[serde(default, deserialize_with = "deserialize_optional_mastery")]
    pub mastery: Option<Mastery>,

    #[serde(default)]
    pub is_onboarded: bool,

    #[serde(default)]
    pub equipment_type: Option<String>,

    /// Owned legendary equipment
    #[serde(default)]
    pub user_equipment_items: Vec<String>,

    #[serde(default)]
    pub user_equipment_accessories: Vec<String>,

    #[serde(default)]
    pub user_abilities: Vec<String>,

    #[serde(default)]
    pub user_mounts: Vec<String>,

    /// Equipment the member still needs
    #[serde(default)]
    pub gear_log: Vec<GearLogRecord>,

    #[serde(default)]
    pub attendance_points: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Create a new, not yet onboarded member.
    pub fn new(email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::generate(),
            email: email.trim().to_lowercase(),
            name: None,
            image: None,
            role: Role::Member,
            cp: 0,
            mastery: None,
            is_onboarded: false,
            equipment_type: None,
            user_equipment_items: Vec::new(),
            user_equipment_accessories: Vec::new(),
            user_abilities: Vec::new(),
            user_mounts: Vec::new(),
            gear_log: Vec::new(),
            attendance_points: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder method to set the display name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.trim().to_string());
        self
    }

    /// Builder method to set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// A member together with their gear log resolved against the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedMember {
    pub member: Member,
    pub needed_gear: Vec<NeededGear>,
}

impl ResolvedMember {
    /// Needed gear whose equipment still exists.
    pub fn valid_gear(&self) -> impl Iterator<Item = (&EquipmentSummary, u32)> {
        self.needed_gear
            .iter()
            .filter_map(|g| g.equipment.resolved().map(|s| (s, g.quantity)))
    }
}
