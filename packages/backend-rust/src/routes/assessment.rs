use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lengua_algo::assessment::{AssessmentOutcome, BehaviorSignal, ProbeVideo};
use lengua_algo::types::CefrLevel;

use crate::response::{json_error, AppError};
use crate::routes::success;
use crate::services::assessment::{AssessmentError, RespondResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start))
        .route("/respond", post(respond))
        .route("/skip", post(skip))
        .route("/:sessionId/progress", get(progress))
        .route("/:sessionId/results", get(results))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartDto {
    session_id: String,
    current_level: CefrLevel,
    current_step: u32,
    total_steps: u32,
    next_video: &'static ProbeVideo,
}

async fn start(
    State(state): State<AppState>,
    payload: Option<Json<StartRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let _user_id = payload
        .and_then(|Json(request)| request.user_id)
        .unwrap_or_else(|| "demo-user".to_string());

    let started = state.assessment().start();
    Ok(Json(success(StartDto {
        session_id: started.session_id,
        current_level: started.current_level,
        current_step: started.current_step,
        total_steps: started.total_steps,
        next_video: started.next_video,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondRequest {
    #[serde(default)]
    user_id: Option<String>,
    session_id: String,
    #[serde(flatten)]
    signal: BehaviorSignal,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RespondDto {
    #[serde(rename_all = "camelCase")]
    Next {
        session_id: String,
        current_level: CefrLevel,
        current_step: u32,
        total_steps: u32,
        next_video: &'static ProbeVideo,
        completed: bool,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        session_id: String,
        completed: bool,
        #[serde(flatten)]
        outcome: AssessmentOutcome,
    },
}

async fn respond(
    State(state): State<AppState>,
    Json(payload): Json<RespondRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = payload.user_id.unwrap_or_else(|| "demo-user".to_string());
    if !(0.0..=1.0).contains(&payload.signal.completion_rate) {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "completionRate must be between 0 and 1",
        ));
    }

    let result = state
        .assessment()
        .respond(&user_id, &payload.session_id, &payload.signal)
        .map_err(assessment_error)?;

    let dto = match result {
        RespondResult::Next {
            session_id,
            current_level,
            current_step,
            total_steps,
            next_video,
        } => RespondDto::Next {
            session_id,
            current_level,
            current_step,
            total_steps,
            next_video,
            completed: false,
        },
        RespondResult::Completed {
            session_id,
            outcome,
        } => {
            // The measured level seeds the learner profile used by the feed.
            if let Err(err) = state
                .recommendation()
                .update_level(&user_id, outcome.estimated_level)
            {
                tracing::warn!(error = %err, "failed to apply assessed level to profile");
            }
            RespondDto::Completed {
                session_id,
                completed: true,
                outcome,
            }
        }
    };

    Ok(Json(success(dto)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkipRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    preferred_level: Option<String>,
}

async fn skip(
    State(state): State<AppState>,
    payload: Option<Json<SkipRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = payload.map(|Json(request)| request);
    let user_id = request
        .as_ref()
        .and_then(|r| r.user_id.clone())
        .unwrap_or_else(|| "demo-user".to_string());

    let preferred_level = match request.as_ref().and_then(|r| r.preferred_level.as_deref()) {
        Some(raw) => CefrLevel::parse(raw).ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("invalid preferredLevel: {raw}"),
            )
        })?,
        None => CefrLevel::A2,
    };

    let outcome = state.assessment().skip(&user_id, preferred_level);
    state
        .recommendation()
        .update_level(&user_id, outcome.estimated_level)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to apply skipped level to profile");
            AppError::internal(err.to_string())
        })?;

    Ok(Json(success(outcome)))
}

async fn progress(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state
        .assessment()
        .progress(&session_id)
        .map_err(assessment_error)?;
    Ok(Json(success(progress)))
}

async fn results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .assessment()
        .results(&session_id)
        .map_err(assessment_error)?;
    Ok(Json(success(outcome)))
}

fn assessment_error(err: AssessmentError) -> AppError {
    match err {
        AssessmentError::SessionNotFound(_) => AppError::not_found(err.to_string()),
        AssessmentError::AlreadyCompleted(_) => AppError::conflict(err.to_string()),
    }
}
