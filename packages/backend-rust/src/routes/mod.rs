mod assessment;
mod feed;
mod health;
mod vocabulary;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Serialize;

use crate::response::json_error;
use crate::state::AppState;

#[derive(Serialize)]
pub(crate) struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub(crate) fn success<T>(data: T) -> SuccessResponse<T> {
    SuccessResponse {
        success: true,
        data,
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/feed", feed::router())
        .nest("/api/assessment", assessment::router())
        .nest("/api/vocabulary", vocabulary::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
