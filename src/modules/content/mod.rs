use axum::Router;
use axum::routing::{get, post};
use crate::state::AppState;
use axum::middleware;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub fn router(state: AppState) -> axum::Router<AppState> {
    Router::new()
        .route("/contents", post(handler::create_content).get(handler::list_contents))
        .route("/contents/{id}", get(handler::get_content))
        .route("/contents/{id}/jobs", get(handler::list_content_jobs))
        .route("/contents/{id}/retry", post(handler::retry_content))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
