use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::{user_header, AppState};
use crate::error::{AppError, AppResult};
use crate::models::{clock_time, most_recent_first, Message, PostMessageRequest};

/// Query parameters for reading messages
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    /// Keep at most this many of the most recent messages (positive integer)
    #[param(value_type = Option<u32>)]
    pub limit: Option<String>,
}

impl ListMessagesQuery {
    /// Parsed `limit`; anything other than a positive integer is rejected
    pub fn limit(&self) -> Result<Option<usize>, String> {
        let Some(raw) = self.limit.as_deref() else {
            return Ok(None);
        };

        match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => Ok(Some(limit)),
            _ => Err(format!("Invalid limit: {raw}")),
        }
    }
}

/// Messages visible to the calling participant, most recent first
#[utoipa::path(
    get,
    path = "/messages",
    tag = "messages",
    params(
        ListMessagesQuery,
        ("user" = String, Header, description = "Name of the reader")
    ),
    responses(
        (status = 200, description = "Visible messages, most recent first", body = Vec<Message>),
        (status = 422, description = "Invalid limit or missing user"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Message>>> {
    let Query(query) = query?;
    let limit = query.limit().map_err(AppError::Validation)?;
    let user = user_header(&headers)
        .ok_or_else(|| AppError::Validation("Missing user header".to_string()))?;

    let messages = state.log.query(&user).await?;

    Ok(Json(most_recent_first(messages, limit)))
}

/// Post a message as the participant named in the `user` header
#[utoipa::path(
    post,
    path = "/messages",
    tag = "messages",
    request_body = PostMessageRequest,
    params(
        ("user" = String, Header, description = "Name of the sender")
    ),
    responses(
        (status = 201, description = "Message stored"),
        (status = 422, description = "Invalid body or unknown sender"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let from = user_header(&headers)
        .ok_or_else(|| AppError::Validation("Missing user header".to_string()))?;
    let Json(req) = payload?;

    if state.directory.find(&from).await?.is_none() {
        return Err(AppError::Validation(format!("Unknown sender: {from}")));
    }

    let message = req
        .into_message(&from, clock_time())
        .map_err(AppError::Validation)?;
    state.log.append(&message).await?;

    metrics::increment_counter!("chatroom_messages_posted_total");

    Ok(StatusCode::CREATED)
}
