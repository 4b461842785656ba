//! REST endpoints for read-only presence queries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub user_id: String,
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct PresenceSummary {
    pub online: usize,
}

/// GET /api/presence/{user_id} — 200 when the identity is registered, 404 otherwise.
pub async fn get_user_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PresenceResponse>, StatusCode> {
    let entry = state.registry.lookup(&user_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(PresenceResponse {
        user_id: entry.user_id,
        online: true,
    }))
}

/// GET /api/presence — count of registered identities.
pub async fn get_presence_summary(State(state): State<AppState>) -> Json<PresenceSummary> {
    Json(PresenceSummary {
        online: state.registry.len(),
    })
}
