use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::views::MemberView;
use crate::api::{Actor, ApiError};
use crate::calculate::compute_guild_stats;
use crate::models::GuildStats;

pub async fn guild_stats(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let stats = compute_guild_stats(state.store.as_ref()).await?;
    Ok((
        [(header::CACHE_CONTROL, state.config.stats.cache_control())],
        Json(stats),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: GuildStats,
    pub current_user: MemberView,
}

/// Stats and the caller's own profile in one round trip.
pub async fn dashboard(
    State(state): State<AppState>,
    Actor(member): Actor,
) -> Result<Json<DashboardResponse>, ApiError> {
    let store = state.store.as_ref();
    let (stats, current) =
        tokio::try_join!(compute_guild_stats(store), store.resolve_member(member))?;

    Ok(Json(DashboardResponse {
        stats,
        current_user: MemberView::from(&current),
    }))
}
