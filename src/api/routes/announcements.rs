use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::record_activity;
use crate::api::state::AppState;
use crate::api::views::{MemberDirectory, MemberSummary};
use crate::api::{Actor, ApiError};
use crate::models::{ActivityAction, ActivityLog, Announcement, EntityId};

/// An announcement with its author populated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementView {
    pub id: EntityId,
    pub title: String,
    pub content: String,
    pub pinned: bool,
    pub created_by: Option<MemberSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnnouncementView {
    fn build(a: Announcement, directory: &MemberDirectory) -> Self {
        Self {
            created_by: directory.summary(&a.created_by),
            id: a.id,
            title: a.title,
            content: a.content,
            pinned: a.pinned,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub pinned: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Announcement not found".to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub async fn list_announcements(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<AnnouncementView>>, ApiError> {
    let store = state.store.as_ref();
    let (announcements, directory) =
        tokio::try_join!(store.list_announcements(), MemberDirectory::load(store))?;

    Ok(Json(
        announcements
            .into_iter()
            .map(|a| AnnouncementView::build(a, &directory))
            .collect(),
    ))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<AnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementView>), ApiError> {
    actor.require_admin()?;

    let (Some(title), Some(content)) = (
        non_blank(req.title.as_deref()),
        non_blank(req.content.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    };

    let announcement = state
        .store
        .insert_announcement(Announcement::new(
            title,
            content,
            req.pinned.unwrap_or(false),
            actor.id().clone(),
        ))
        .await?;

    record_activity(
        state.store.as_ref(),
        &[ActivityLog::new(
            actor.id().clone(),
            ActivityAction::AnnouncementCreated,
            format!("Posted: {}", announcement.title),
        )],
    )
    .await;

    let directory = MemberDirectory::from_members(std::slice::from_ref(&actor.0));
    Ok((
        StatusCode::CREATED,
        Json(AnnouncementView::build(announcement, &directory)),
    ))
}

/// Blank title or content leaves the stored value in place.
pub async fn update_announcement(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<AnnouncementRequest>,
) -> Result<Json<AnnouncementView>, ApiError> {
    actor.require_admin()?;

    let mut announcement = state
        .store
        .get_announcement(&EntityId::from(id))
        .await?
        .ok_or_else(not_found)?;

    if let Some(title) = non_blank(req.title.as_deref()) {
        announcement.title = title.to_string();
    }
    if let Some(content) = non_blank(req.content.as_deref()) {
        announcement.content = content.to_string();
    }
    if let Some(pinned) = req.pinned {
        announcement.pinned = pinned;
    }

    let store = state.store.as_ref();
    let announcement = store
        .update_announcement(announcement)
        .await?
        .ok_or_else(not_found)?;

    record_activity(
        store,
        &[ActivityLog::new(
            actor.id().clone(),
            ActivityAction::AnnouncementUpdated,
            "Updated announcement",
        )],
    )
    .await;

    let directory = MemberDirectory::load(store).await?;
    Ok(Json(AnnouncementView::build(announcement, &directory)))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    actor.require_admin()?;

    state
        .store
        .delete_announcement(&EntityId::from(id))
        .await?
        .ok_or_else(not_found)?;

    record_activity(
        state.store.as_ref(),
        &[ActivityLog::new(
            actor.id().clone(),
            ActivityAction::AnnouncementDeleted,
            "Deleted announcement",
        )],
    )
    .await;

    Ok(Json(SuccessResponse { success: true }))
}
