use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::AppState;
use crate::error::AppResult;
use crate::ingest::{publish, SensorMessage, Topic};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishRequest {
    /// `sensors/<deviceId>/<npk|moisture|temperature|reading>`
    pub topic: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublishResponse {
    pub topic: String,
    pub queued: bool,
}

/// Publish a sensor message to the ingest queue
///
/// The message is persisted asynchronously; malformed payloads are dropped by
/// the worker, not rejected here.
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = PublishRequest,
    responses(
        (status = 202, description = "Message queued", body = PublishResponse),
        (status = 400, description = "Invalid topic"),
        (status = 503, description = "Ingest queue full"),
    ),
    tag = "ingest"
)]
pub async fn publish_message(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> AppResult<(StatusCode, Json<PublishResponse>)> {
    let topic: Topic = request.topic.parse()?;
    let response = PublishResponse {
        topic: topic.to_string(),
        queued: true,
    };

    publish(
        &state.ingest_tx,
        SensorMessage {
            topic,
            payload: request.payload,
        },
    )?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}
