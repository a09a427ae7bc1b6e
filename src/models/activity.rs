//! Activity log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, MemberId};

/// What kind of change an activity entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    EquipmentAdded,
    EquipmentUpdated,
    EquipmentDeleted,
    AnnouncementCreated,
    AnnouncementUpdated,
    AnnouncementDeleted,
    MemberJoined,
    ProfileUpdated,
    GearMarkedDone,
    NameUpdated,
    CpUpdated,
    MasteryUpdated,
    EquipmentTypeUpdated,
    LegendaryEquipmentAdded,
    LegendaryEquipmentRemoved,
    AccessoryAdded,
    AccessoryRemoved,
    AbilityAdded,
    AbilityRemoved,
    MountAdded,
    MountRemoved,
    ItemLogAdded,
    ItemLogRemoved,
    AdminUpdatedUser,
}

/// One entry in the guild activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: EntityId,
    pub action: ActivityAction,
    /// The member who performed the action
    pub user: MemberId,
    #[serde(default)]
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new(user: MemberId, action: ActivityAction, details: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            action,
            user,
            details: details.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serialization() {
        assert_eq!(
            serde_json::to_string(&ActivityAction::LegendaryEquipmentAdded).unwrap(),
            "\"legendary_equipment_added\""
        );
        assert_eq!(
            serde_json::to_string(&ActivityAction::CpUpdated).unwrap(),
            "\"cp_updated\""
        );
        let parsed: ActivityAction = serde_json::from_str("\"admin_updated_user\"").unwrap();
        assert_eq!(parsed, ActivityAction::AdminUpdatedUser);
    }

    #[test]
    fn test_activity_log_new() {
        let log = ActivityLog::new("m1".into(), ActivityAction::MemberJoined, "Ana joined the guild");
        assert_eq!(log.user.as_str(), "m1");
        assert_eq!(log.details, "Ana joined the guild");
    }
}
