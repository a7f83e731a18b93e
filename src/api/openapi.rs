//! OpenAPI documentation for the chat room API

use axum::Json;
use utoipa::OpenApi;

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chat Room API",
        version = "1.0.0",
        description = "Minimal chat room backend.\n\n## Features\n- Join the room with a display name\n- Post public and private messages\n- Keep-alive heartbeats; silent participants are pruned automatically",
        license(name = "MIT"),
        contact(name = "Chatroom Team")
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    tags(
        (name = "participants", description = "Joining the room and heartbeats"),
        (name = "messages", description = "Posting and reading messages"),
        (name = "health", description = "Liveness and metrics")
    ),
    paths(
        crate::api::participants::list,
        crate::api::participants::create,
        crate::api::messages::list,
        crate::api::messages::create,
        crate::api::status::heartbeat,
        crate::api::health::health_check,
        crate::api::metrics::metrics_handler,
    ),
    components(
        schemas(
            crate::models::Participant,
            crate::models::JoinRequest,
            crate::models::Message,
            crate::models::MessageKind,
            crate::models::PostMessageRequest,
            crate::api::health::HealthResponse,
        )
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
