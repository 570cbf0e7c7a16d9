use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use lengua_algo::srs::{ReviewQuality, VocabularyEntry, VocabularyStats};

use crate::response::{json_error, AppError};
use crate::routes::success;
use crate::services::vocabulary::VocabularyError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/click", post(click))
        .route("/save", post(save))
        .route("/review", post(review))
        .route("/due", get(due))
        .route("/stats", get(stats))
        .route("/:word", delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: Option<String>,
}

impl UserQuery {
    fn user_id(self) -> String {
        self.user_id.unwrap_or_else(|| "demo-user".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClickRequest {
    user_id: Option<String>,
    word: String,
    translation: String,
    #[serde(default)]
    context: Option<String>,
}

async fn click(
    State(state): State<AppState>,
    Json(payload): Json<ClickRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.word.trim().is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "word must not be empty",
        ));
    }
    let user_id = payload.user_id.unwrap_or_else(|| "demo-user".to_string());

    let entry = state
        .vocabulary()
        .record_click(
            &user_id,
            &payload.word,
            &payload.translation,
            payload.context,
            Utc::now(),
        )
        .map_err(vocabulary_error)?;

    Ok(Json(success(entry)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest {
    user_id: Option<String>,
    word: String,
}

async fn save(
    State(state): State<AppState>,
    Json(payload): Json<SaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = payload.user_id.unwrap_or_else(|| "demo-user".to_string());
    let entry = state
        .vocabulary()
        .save_word(&user_id, &payload.word)
        .map_err(vocabulary_error)?;
    Ok(Json(success(entry)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    user_id: Option<String>,
    word: String,
    /// 1 = again, 2 = hard, 3 = good, 4 = easy.
    quality: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDto {
    entry: VocabularyEntry,
    next_review_in: u32,
}

async fn review(
    State(state): State<AppState>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = payload.user_id.unwrap_or_else(|| "demo-user".to_string());
    let quality = ReviewQuality::from_u8(payload.quality).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "quality must be between 1 and 4",
        )
    })?;

    let outcome = state
        .vocabulary()
        .update_review(&user_id, &payload.word, quality, Utc::now())
        .map_err(vocabulary_error)?;

    Ok(Json(success(ReviewDto {
        entry: outcome.entry,
        next_review_in: outcome.next_review_in_days,
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DueDto {
    due_words: Vec<VocabularyEntry>,
    count: usize,
}

async fn due(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let due_words = state
        .vocabulary()
        .due_for_review(&query.user_id(), Utc::now())
        .map_err(vocabulary_error)?;
    Ok(Json(success(DueDto {
        count: due_words.len(),
        due_words,
    })))
}

async fn stats(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats: VocabularyStats = state
        .vocabulary()
        .stats(&query.user_id(), Utc::now())
        .map_err(vocabulary_error)?;
    Ok(Json(success(stats)))
}

async fn remove(
    State(state): State<AppState>,
    Path(word): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    state
        .vocabulary()
        .delete(&query.user_id(), &word)
        .map_err(vocabulary_error)?;
    Ok(Json(success(serde_json::json!({ "word": word }))))
}

fn vocabulary_error(err: VocabularyError) -> AppError {
    match err {
        VocabularyError::NotFound(word) => {
            AppError::not_found(format!("word not found: {word}"))
        }
        VocabularyError::Store(err) => {
            tracing::error!(error = %err, "vocabulary store failure");
            AppError::internal(err.to_string())
        }
    }
}
