pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod sources;
pub mod state;
pub mod store;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub fn create_app_from_env() -> axum::Router {
    let config = Config::from_env();
    create_app(AppState::from_config(&config))
}
