use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::activity::record_activity;
use crate::api::state::AppState;
use crate::api::{Actor, ApiError};
use crate::models::{ActivityAction, ActivityLog, EntityId, Equipment, EquipmentKind};

#[derive(Debug, Deserialize)]
pub struct EquipmentRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_name(raw: &str) -> Result<&str, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    Ok(name)
}

fn parse_kind(raw: &str) -> Result<EquipmentKind, ApiError> {
    EquipmentKind::parse(raw).ok_or_else(|| {
        ApiError::BadRequest(format!("Type must be gear or special, got {:?}", raw))
    })
}

pub async fn list_equipment(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<Equipment>>, ApiError> {
    Ok(Json(state.store.list_equipment().await?))
}

pub async fn create_equipment(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<EquipmentRequest>,
) -> Result<(StatusCode, Json<Equipment>), ApiError> {
    let name = parse_name(req.name.as_deref().unwrap_or_default())?;
    let kind = parse_kind(
        req.kind
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Type is required".to_string()))?,
    )?;

    let equipment = state
        .store
        .insert_equipment(Equipment::new(name, kind, actor.id().clone()))
        .await?;
    info!("Equipment {} added by {}", equipment.id, actor.id());

    record_activity(
        state.store.as_ref(),
        &[ActivityLog::new(
            actor.id().clone(),
            ActivityAction::EquipmentAdded,
            format!("Added {}: {}", equipment.kind, equipment.name),
        )],
    )
    .await;

    Ok((StatusCode::CREATED, Json(equipment)))
}

pub async fn update_equipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<EquipmentRequest>,
) -> Result<Json<Equipment>, ApiError> {
    let id = EntityId::from(id);
    let mut equipment = state
        .store
        .get_equipment(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Equipment not found".to_string()))?;

    if let Some(raw) = req.name.as_deref() {
        equipment.name = parse_name(raw)?.to_string();
    }
    if let Some(raw) = req.kind.as_deref() {
        equipment.kind = parse_kind(raw)?;
    }

    let equipment = state
        .store
        .update_equipment(equipment)
        .await?
        .ok_or_else(|| ApiError::NotFound("Equipment not found".to_string()))?;

    record_activity(
        state.store.as_ref(),
        &[ActivityLog::new(
            actor.id().clone(),
            ActivityAction::EquipmentUpdated,
            format!("Updated {}: {}", equipment.kind, equipment.name),
        )],
    )
    .await;

    Ok(Json(equipment))
}

/// Member gear logs keep the removed id; reads treat it as stale.
pub async fn delete_equipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state
        .store
        .delete_equipment(&EntityId::from(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Equipment not found".to_string()))?;
    info!("Equipment {} deleted by {}", removed.id, actor.id());

    record_activity(
        state.store.as_ref(),
        &[ActivityLog::new(
            actor.id().clone(),
            ActivityAction::EquipmentDeleted,
            format!("Deleted {}: {}", removed.kind, removed.name),
        )],
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Equipment deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::test_support::*;
    use crate::models::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_equipment_lifecycle_logs_activity() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());
        let ana = add_member(&state, "Ana", Role::Member).await;

        let (status, _, created) = send(
            build_router(state.clone()),
            "POST",
            "/api/equipment",
            Some(&ana),
            Some(json!({"name": "  Frost Helm ", "type": "Gear"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Frost Helm");
        assert_eq!(created["type"], "gear");
        assert_eq!(created["createdBy"], ana.id.as_str());
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _, updated) = send(
            build_router(state.clone()),
            "PUT",
            &format!("/api/equipment/{}", id),
            Some(&ana),
            Some(json!({"name": "Storm Helm", "type": "special"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Storm Helm");
        assert_eq!(updated["type"], "special");

        let (status, listed) = get_json(build_router(state.clone()), "/api/equipment", &ana).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _, deleted) = send(
            build_router(state.clone()),
            "DELETE",
            &format!("/api/equipment/{}", id),
            Some(&ana),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], "Equipment deleted");

        let feed = state.store.recent_activity(10).await.unwrap();
        let mut details: Vec<_> = feed.iter().map(|l| l.details.clone()).collect();
        details.sort();
        assert_eq!(
            details,
            vec![
                "Added gear: Frost Helm",
                "Deleted special: Storm Helm",
                "Updated special: Storm Helm",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name_and_bad_type() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());
        let ana = add_member(&state, "Ana", Role::Member).await;

        let (status, _, json) = send(
            build_router(state.clone()),
            "POST",
            "/api/equipment",
            Some(&ana),
            Some(json!({"name": "   ", "type": "gear"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");

        let (status, _, _) = send(
            build_router(state.clone()),
            "POST",
            "/api/equipment",
            Some(&ana),
            Some(json!({"name": "Helm", "type": "armor"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(state.store.count_equipment().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_equipment_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path());
        let ana = add_member(&state, "Ana", Role::Member).await;

        let (status, _, _) = send(
            build_router(state.clone()),
            "PUT",
            "/api/equipment/nope",
            Some(&ana),
            Some(json!({"name": "Helm"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(
            build_router(state.clone()),
            "DELETE",
            "/api/equipment/nope",
            Some(&ana),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(state.store.recent_activity(10).await.unwrap().is_empty());
    }
}
