use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::views::{MemberDirectory, MemberSummary};
use crate::api::{Actor, ApiError};
use crate::models::{ActivityAction, EntityId};

/// Entries shown in the activity feed.
pub const FEED_SIZE: usize = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: EntityId,
    pub action: ActivityAction,
    /// `None` when the acting member has since been removed
    pub user: Option<MemberSummary>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

pub async fn recent_activity(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<ActivityView>>, ApiError> {
    let store = state.store.as_ref();
    let (logs, directory) = tokio::try_join!(
        store.recent_activity(FEED_SIZE),
        MemberDirectory::load(store)
    )?;

    Ok(Json(
        logs.into_iter()
            .map(|log| ActivityView {
                user: directory.summary(&log.user),
                id: log.id,
                action: log.action,
                details: log.details,
                created_at: log.created_at,
            })
            .collect(),
    ))
}
