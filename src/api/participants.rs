use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use tracing::info;

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{clock_time, now_millis, JoinRequest, Message, Participant};

/// List everyone currently in the room
#[utoipa::path(
    get,
    path = "/participants",
    tag = "participants",
    responses(
        (status = 200, description = "Participants in the room", body = Vec<Participant>),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Participant>>> {
    let participants = state.directory.list_all().await?;
    Ok(Json(participants))
}

/// Join the room
#[utoipa::path(
    post,
    path = "/participants",
    tag = "participants",
    request_body = JoinRequest,
    responses(
        (status = 201, description = "Joined"),
        (status = 409, description = "Name already taken"),
        (status = 422, description = "Invalid or missing name"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(req) = payload?;
    let name = req.validate().map_err(AppError::Validation)?;

    state.directory.upsert_if_absent(&name, now_millis()).await?;
    state.log.append(&Message::arrival(name.as_str(), clock_time())).await?;

    metrics::increment_counter!("chatroom_participants_joined_total");
    info!("Participant joined: {}", name);

    Ok(StatusCode::CREATED)
}
