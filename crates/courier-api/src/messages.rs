use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use courier_core::DispatchError;
use courier_types::api::{Claims, SendMessageRequest};
use courier_types::models::MessageFilter;

use crate::auth::AppState;
use crate::middleware::resolve_user;

/// Upper bound on message content length, in characters.
const MAX_CONTENT_LEN: usize = 4000;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() || req.content.chars().count() > MAX_CONTENT_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.destinations.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = resolve_user(&state, &claims).await?;

    let message = state
        .engine
        .send_message(&user, &req.content, &req.destinations)
        .await
        .map_err(|e| match e {
            DispatchError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::Storage(err) => {
                error!("message dispatch storage failure: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    // Per-destination outcomes are data in the response, not errors.
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<MessageFilter>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = resolve_user(&state, &claims).await?;

    let messages = state
        .queries
        .messages_for_owner(&user, filter)
        .await
        .map_err(|e| {
            error!("message listing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(messages))
}
