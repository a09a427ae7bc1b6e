//! Attendance events.
//!
//! Each member listed on an event earns one attendance point; editing the
//! participant list or deleting the event moves points back accordingly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::activity::diff_list;
use crate::api::state::AppState;
use crate::api::views::{MemberDirectory, MemberName, MemberSummary};
use crate::api::{Actor, ApiError};
use crate::models::{dedup_participants, EntityId, GuildEvent, MemberId};
use crate::storage::GuildStore;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: EntityId,
    pub title: String,
    pub participants: Vec<MemberSummary>,
    pub created_by: Option<MemberName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventView {
    fn build(event: GuildEvent, directory: &MemberDirectory) -> Self {
        Self {
            participants: directory.summaries(&event.participants),
            created_by: directory.name(&event.created_by),
            id: event.id,
            title: event.title,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: Option<String>,
    pub participant_ids: Option<Vec<MemberId>>,
}

impl EventRequest {
    fn validate(self) -> Result<(String, Vec<MemberId>), ApiError> {
        match (self.title, self.participant_ids) {
            (Some(title), Some(ids)) if !title.trim().is_empty() => {
                Ok((title.trim().to_string(), dedup_participants(ids)))
            }
            _ => Err(ApiError::BadRequest(
                "Title and participants are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Event not found".to_string())
}

async fn populate(store: &dyn GuildStore, event: GuildEvent) -> Result<EventView, ApiError> {
    let directory = MemberDirectory::load(store).await?;
    Ok(EventView::build(event, &directory))
}

pub async fn list_events(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<EventView>>, ApiError> {
    let store = state.store.as_ref();
    let (events, directory) = tokio::try_join!(store.list_events(), MemberDirectory::load(store))?;

    Ok(Json(
        events
            .into_iter()
            .map(|e| EventView::build(e, &directory))
            .collect(),
    ))
}

pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<EventRequest>,
) -> Result<(StatusCode, Json<EventView>), ApiError> {
    actor.require_admin()?;
    let (title, participants) = req.validate()?;

    let store = state.store.as_ref();
    let event = store
        .insert_event(GuildEvent::new(&title, participants, actor.id().clone()))
        .await?;
    let credited = store.adjust_attendance(&event.participants, 1).await?;
    info!(
        "Event {} created with {} participants ({} credited)",
        event.id,
        event.participants.len(),
        credited
    );

    Ok((StatusCode::CREATED, Json(populate(store, event).await?)))
}

pub async fn update_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<EventRequest>,
) -> Result<Json<EventView>, ApiError> {
    actor.require_admin()?;
    let (title, participants) = req.validate()?;

    let store = state.store.as_ref();
    let mut event = store
        .get_event(&EntityId::from(id))
        .await?
        .ok_or_else(not_found)?;

    let (added, removed) = diff_list(&event.participants, &participants);
    let added: Vec<MemberId> = added.into_iter().cloned().collect();
    let removed: Vec<MemberId> = removed.into_iter().cloned().collect();

    store.adjust_attendance(&removed, -1).await?;
    store.adjust_attendance(&added, 1).await?;

    event.title = title;
    event.participants = participants;
    let event = store.update_event(event).await?.ok_or_else(not_found)?;

    Ok(Json(populate(store, event).await?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    actor.require_admin()?;

    let store = state.store.as_ref();
    let id = EntityId::from(id);
    let event = store.get_event(&id).await?.ok_or_else(not_found)?;

    store.adjust_attendance(&event.participants, -1).await?;
    store.delete_event(&id).await?;
    info!("Event {} deleted by {}", id, actor.id());

    Ok(Json(MessageResponse {
        message: "Event deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::test_support::*;
    use crate::api::state::AppState;
    use crate::models::{Member, Role};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn points(state: &AppState, member: &Member) -> i64 {
        state
            .store
            .get_member(&member.id)
            .await
            .unwrap()
            .unwrap()
            .attendance_points
    }

    #[tokio::test]
    async fn test_attendance_follows_event_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());
        let boss = add_member(&state, "Boss", Role::Admin).await;
        let ana = add_member(&state, "Ana", Role::Member).await;
        let bo = add_member(&state, "Bo", Role::Member).await;
        let cy = add_member(&state, "Cy", Role::Member).await;

        let (status, _, created) = send(
            build_router(state.clone()),
            "POST",
            "/api/events",
            Some(&boss),
            Some(json!({
                "title": " Castle Siege ",
                "participantIds": [ana.id.as_str(), bo.id.as_str(), ana.id.as_str()]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Castle Siege");
        assert_eq!(created["participants"].as_array().unwrap().len(), 2);
        assert_eq!(created["participants"][0]["name"], "Ana");
        assert_eq!(created["createdBy"], json!({"id": boss.id.as_str(), "name": "Boss"}));
        assert_eq!(points(&state, &ana).await, 1);
        assert_eq!(points(&state, &bo).await, 1);

        let event_id = created["id"].as_str().unwrap().to_string();
        let (status, _, updated) = send(
            build_router(state.clone()),
            "PUT",
            &format!("/api/events/{}", event_id),
            Some(&boss),
            Some(json!({
                "title": "Castle Siege",
                "participantIds": [bo.id.as_str(), cy.id.as_str()]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = updated["participants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Bo", "Cy"]);
        assert_eq!(points(&state, &ana).await, 0);
        assert_eq!(points(&state, &bo).await, 1);
        assert_eq!(points(&state, &cy).await, 1);

        let (status, listed) = get_json(build_router(state.clone()), "/api/events", &ana).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _, deleted) = send(
            build_router(state.clone()),
            "DELETE",
            &format!("/api/events/{}", event_id),
            Some(&boss),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], "Event deleted");
        assert_eq!(points(&state, &bo).await, 0);
        assert_eq!(points(&state, &cy).await, 0);
        assert!(state.store.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_validation_and_permissions() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());
        let boss = add_member(&state, "Boss", Role::Admin).await;
        let ana = add_member(&state, "Ana", Role::Member).await;

        let (status, _, _) = send(
            build_router(state.clone()),
            "POST",
            "/api/events",
            Some(&ana),
            Some(json!({"title": "Raid", "participantIds": []})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = send(
            build_router(state.clone()),
            "POST",
            "/api/events",
            Some(&boss),
            Some(json!({"title": "Raid"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(
            build_router(state.clone()),
            "PUT",
            "/api/events/missing",
            Some(&boss),
            Some(json!({"title": "Raid", "participantIds": [ana.id.as_str()]})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(points(&state, &ana).await, 0);

        let (status, _, _) = send(
            build_router(state.clone()),
            "DELETE",
            "/api/events/missing",
            Some(&boss),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
