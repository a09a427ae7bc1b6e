//! Attendance events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, MemberId};

/// A guild activity (raid, siege, ...) and the members who attended it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildEvent {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub participants: Vec<MemberId>,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuildEvent {
    pub fn new(title: &str, participants: Vec<MemberId>, created_by: MemberId) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::generate(),
            title: title.trim().to_string(),
            participants: dedup_participants(participants),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Drop repeated participant ids, keeping first occurrence order.
///
/// Attendance points move by exactly one per event, so a member listed twice
/// must still count once.
pub fn dedup_participants(ids: Vec<MemberId>) -> Vec<MemberId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_dedups_participants() {
        let event = GuildEvent::new(
            " Siege ",
            vec!["a".into(), "b".into(), "a".into()],
            "admin".into(),
        );
        assert_eq!(event.title, "Siege");
        assert_eq!(event.participants, vec![EntityId::from("a"), EntityId::from("b")]);
    }
}
