//! Guild announcements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, MemberId};

/// A message posted by an admin to the announcement board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: EntityId,
    pub title: String,
    pub content: String,
    pub created_by: MemberId,
    /// Pinned announcements sort ahead of everything else
    #[serde(default)]
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(title: &str, content: &str, pinned: bool, created_by: MemberId) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::generate(),
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            created_by,
            pinned,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Board order: pinned first, then newest first.
pub fn sort_for_board(announcements: &mut [Announcement]) {
    announcements.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
