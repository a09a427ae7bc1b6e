//! REST API endpoints.
//!
//! Axum-based HTTP API for the guild roster, equipment catalog, activity
//! feed, announcements, attendance and derived statistics.
//!
//! Callers are identified by the `x-member-id` header, which the fronting
//! auth proxy sets after sign-in.

pub mod routes;
pub mod state;
pub mod views;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::models::{EntityId, Member};
use crate::storage::StoreError;
use state::AppState;

/// Header carrying the id of the signed-in member.
pub const MEMBER_HEADER: &str = "x-member-id";

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!("Store operation failed: {}", e);
        ApiError::Internal(e.to_string())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// The signed-in member making the request.
#[derive(Debug, Clone)]
pub struct Actor(pub Member);

impl Actor {
    pub fn id(&self) -> &EntityId {
        &self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.role.is_admin()
    }

    /// Reject non-admins with 403.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let id = parts
            .headers
            .get(MEMBER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        match state.store.get_member(&EntityId::from(id)).await? {
            Some(member) => Ok(Actor(member)),
            None => {
                warn!("Rejected request from unknown member {}", id);
                Err(ApiError::Unauthorized)
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    use routes::{activity, announcements, equipment, events, members, profile, stats};

    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/stats", get(stats::guild_stats))
        .route("/api/dashboard", get(stats::dashboard))
        .route("/api/members", get(members::list_members))
        .route(
            "/api/equipment",
            get(equipment::list_equipment).post(equipment::create_equipment),
        )
        .route(
            "/api/equipment/:id",
            axum::routing::put(equipment::update_equipment).delete(equipment::delete_equipment),
        )
        .route(
            "/api/user",
            get(profile::current_user).put(profile::update_user),
        )
        .route("/api/onboarding", axum::routing::post(profile::onboard))
        .route("/api/activity", get(activity::recent_activity))
        .route(
            "/api/announcements",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route(
            "/api/announcements/:id",
            axum::routing::put(announcements::update_announcement)
                .delete(announcements::delete_announcement),
        )
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            axum::routing::put(events::update_event).delete(events::delete_event),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
