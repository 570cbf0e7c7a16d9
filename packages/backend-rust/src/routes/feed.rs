use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lengua_algo::types::{CefrLevel, ContentType, FeedItem};

use crate::response::{json_error, AppError};
use crate::routes::success;
use crate::services::recommendation::{FeedQuery, InteractionUpdate, RecommendationError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_feed))
        .route("/interaction", post(track_interaction))
        .route("/watch", post(track_watch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedParams {
    user_id: Option<String>,
    limit: Option<usize>,
    category: Option<String>,
    user_level: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedDto {
    items: Vec<FeedItem>,
    count: usize,
    fetched_candidates: usize,
    failed_sources: usize,
}

async fn get_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = params.user_id.unwrap_or_else(|| "demo-user".to_string());

    let level = match params.user_level.as_deref() {
        Some(raw) => Some(CefrLevel::parse(raw).ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("invalid userLevel: {raw}"),
            )
        })?),
        None => None,
    };

    let query = FeedQuery {
        limit: params.limit,
        category: params.category,
        level,
    };

    let page = state
        .recommendation()
        .generate_feed(&user_id, &query)
        .await
        .map_err(internal)?;

    Ok(Json(success(FeedDto {
        count: page.items.len(),
        fetched_candidates: page.fetched_candidates,
        failed_sources: page.failed_sources,
        items: page.items,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionRequest {
    user_id: Option<String>,
    content_id: String,
    content_type: Option<String>,
    liked: Option<bool>,
    saved: Option<bool>,
    completed: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InteractionDto {
    content_id: String,
    content_type_preference: std::collections::HashMap<ContentType, f64>,
}

async fn track_interaction(
    State(state): State<AppState>,
    Json(payload): Json<InteractionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = payload.user_id.unwrap_or_else(|| "demo-user".to_string());
    if payload.content_id.trim().is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "contentId must not be empty",
        ));
    }

    let content_type = payload.content_type.as_deref().and_then(ContentType::parse);
    let update = InteractionUpdate {
        liked: payload.liked,
        saved: payload.saved,
        completed: payload.completed,
        content_type,
    };

    let profile = state
        .recommendation()
        .track_interaction(&user_id, &payload.content_id, &update)
        .map_err(internal)?;

    Ok(Json(success(InteractionDto {
        content_id: payload.content_id,
        content_type_preference: profile.content_type_preference,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchRequest {
    user_id: Option<String>,
    content_id: String,
    seconds: f64,
}

async fn track_watch(
    State(state): State<AppState>,
    Json(payload): Json<WatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = payload.user_id.unwrap_or_else(|| "demo-user".to_string());
    if !payload.seconds.is_finite() || payload.seconds < 0.0 {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "seconds must be a non-negative number",
        ));
    }

    state
        .recommendation()
        .track_watch_time(&user_id, &payload.content_id, payload.seconds)
        .map_err(internal)?;

    Ok(Json(success(serde_json::json!({
        "contentId": payload.content_id,
        "seconds": payload.seconds,
    }))))
}

fn internal(err: RecommendationError) -> AppError {
    tracing::error!(error = %err, "recommendation service failure");
    AppError::internal(err.to_string())
}
