//! Equipment catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{EntityId, EquipmentId, MemberId};

/// Equipment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentKind {
    /// Ordinary gear, counted in the "most needed" table
    Gear,
    /// Rarer special items
    Special,
}

impl EquipmentKind {
    /// Parse a kind label, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gear" => Some(EquipmentKind::Gear),
            "special" => Some(EquipmentKind::Special),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for EquipmentKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EquipmentKind::parse(&raw).ok_or_else(|| {
            serde::de::Error::unknown_variant(&raw, &["gear", "special"])
        })
    }
}

impl std::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentKind::Gear => write!(f, "gear"),
            EquipmentKind::Special => write!(f, "special"),
        }
    }
}

/// A piece of equipment known to the guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: EquipmentId,

    /// Display name (trimmed)
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EquipmentKind,

    /// Member who added it
    pub created_by: MemberId,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    pub fn new(name: &str, kind: EquipmentKind, created_by: MemberId) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::generate(),
            name: name.trim().to_string(),
            kind,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// The projection carried by resolved gear-log entries.
    pub fn summary(&self) -> EquipmentSummary {
        EquipmentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}

/// Id, name and kind of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSummary {
    pub id: EquipmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EquipmentKind,
}
