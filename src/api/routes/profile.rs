//! The caller's own profile: read, edit and first-time onboarding.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::activity::{profile_changes, record_activity};
use crate::api::state::AppState;
use crate::api::views::MemberView;
use crate::api::{Actor, ApiError};
use crate::models::{ActivityAction, ActivityLog, GearLogRecord, Mastery, MemberId};

/// Largest CP a profile may hold.
pub const MAX_CP: u64 = u32::MAX as u64;

/// CP as sent by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CpInput {
    Number(f64),
    Text(String),
}

impl CpInput {
    /// Whole CP in `0..=MAX_CP`, or `None` when the value is not numeric or
    /// out of range.
    pub fn value(&self) -> Option<u64> {
        let n = match self {
            CpInput::Number(n) => *n,
            CpInput::Text(s) if s.trim().is_empty() => 0.0,
            CpInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if n.is_finite() && (0.0..=MAX_CP as f64).contains(&n) {
            Some(n.round() as u64)
        } else {
            None
        }
    }
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// Edit another member's profile (admins only)
    pub user_id: Option<MemberId>,
    pub name: Option<String>,
    pub cp: Option<CpInput>,
    #[serde(default, deserialize_with = "present")]
    pub mastery: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub equipment_type: Option<Option<String>>,
    pub user_equipment_items: Option<Vec<String>>,
    pub user_equipment_accessories: Option<Vec<String>>,
    pub user_abilities: Option<Vec<String>>,
    pub user_mounts: Option<Vec<String>>,
    pub gear_log: Option<Vec<GearLogRecord>>,
}

fn parse_mastery(raw: Option<&str>) -> Result<Option<Mastery>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => Mastery::parse(label)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown mastery: {}", label))),
    }
}

pub async fn current_user(
    State(state): State<AppState>,
    Actor(member): Actor,
) -> Result<Json<MemberView>, ApiError> {
    let resolved = state.store.resolve_member(member).await?;
    Ok(Json(MemberView::from(&resolved)))
}

/// Apply a partial update to the caller's profile, or to another member's
/// profile when an admin passes `userId`, and record what changed.
pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<MemberView>, ApiError> {
    let target_id = req.user_id.clone().unwrap_or_else(|| actor.id().clone());
    let editing_other = &target_id != actor.id();
    if editing_other && !actor.is_admin() {
        return Err(ApiError::Unauthorized);
    }

    let current = if editing_other {
        state
            .store
            .get_member(&target_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
    } else {
        actor.0.clone()
    };

    let mut next = current.clone();
    if let Some(name) = req.name {
        next.name = Some(name);
    }
    if let Some(cp) = &req.cp {
        next.cp = cp
            .value()
            .ok_or_else(|| ApiError::BadRequest(format!("CP must be a number between 0 and {}", MAX_CP)))?;
    }
    if let Some(mastery) = &req.mastery {
        next.mastery = parse_mastery(mastery.as_deref())?;
    }
    if let Some(equipment_type) = req.equipment_type {
        next.equipment_type = equipment_type;
    }
    if let Some(items) = req.user_equipment_items {
        next.user_equipment_items = items;
    }
    if let Some(items) = req.user_equipment_accessories {
        next.user_equipment_accessories = items;
    }
    if let Some(items) = req.user_abilities {
        next.user_abilities = items;
    }
    if let Some(items) = req.user_mounts {
        next.user_mounts = items;
    }
    if let Some(log) = req.gear_log {
        next.gear_log = log;
    }

    let updated = state
        .store
        .update_member(next)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let store = state.store.as_ref();
    let (before, after) =
        tokio::try_join!(store.resolve_member(current), store.resolve_member(updated))?;

    let entries = profile_changes(&before, &after, actor.id(), editing_other);
    record_activity(store, &entries).await;

    Ok(Json(MemberView::from(&after)))
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub name: Option<String>,
    pub cp: Option<CpInput>,
    pub mastery: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Complete first-time setup: name, CP and mastery.
pub async fn onboard(
    State(state): State<AppState>,
    Actor(member): Actor,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    let mastery = parse_mastery(req.mastery.as_deref())?;
    let (false, Some(mastery)) = (name.is_empty(), mastery) else {
        return Err(ApiError::BadRequest(
            "Name and mastery are required".to_string(),
        ));
    };

    let mut next = member;
    next.name = Some(name.to_string());
    next.cp = req.cp.as_ref().and_then(CpInput::value).unwrap_or(0);
    next.mastery = Some(mastery);
    next.is_onboarded = true;

    let updated = state
        .store
        .update_member(next)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!("Member {} completed onboarding", updated.id);

    record_activity(
        state.store.as_ref(),
        &[ActivityLog::new(
            updated.id.clone(),
            ActivityAction::MemberJoined,
            format!("{} joined the guild", name),
        )],
    )
    .await;

    Ok(Json(SuccessResponse { success: true }))
}
