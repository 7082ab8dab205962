use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

use courier_types::api::UpdateLimitRequest;
use courier_types::models::MessageFilter;

use crate::auth::AppState;

pub async fn list_all_messages(
    State(state): State<AppState>,
    Query(filter): Query<MessageFilter>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = state.queries.all_messages(filter).await.map_err(|e| {
        error!("admin message listing failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(messages))
}

pub async fn user_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let metrics = state.metrics.all_user_metrics().await.map_err(|e| {
        error!("metrics collection failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(metrics))
}

pub async fn update_user_limit(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateLimitRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.daily_limit < 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let id = user_id.to_string();
    let updated = tokio::task::spawn_blocking(move || db.update_user_limit(&id, req.daily_limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !updated {
        return Err(StatusCode::NOT_FOUND);
    }

    info!(user_id = %user_id, daily_limit = req.daily_limit, "daily limit updated");
    Ok(StatusCode::NO_CONTENT)
}
