use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::api::{user_header, AppState};
use crate::error::{AppError, AppResult};
use crate::models::now_millis;

/// Heartbeat keeping the calling participant in the room
#[utoipa::path(
    post,
    path = "/status",
    tag = "participants",
    params(
        ("user" = String, Header, description = "Name of the participant")
    ),
    responses(
        (status = 200, description = "Liveness refreshed"),
        (status = 404, description = "Unknown participant"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn heartbeat(State(state): State<AppState>, headers: HeaderMap) -> AppResult<StatusCode> {
    let user = user_header(&headers)
        .ok_or_else(|| AppError::NotFound("Missing user header".to_string()))?;

    state.directory.heartbeat(&user, now_millis()).await?;

    Ok(StatusCode::OK)
}
