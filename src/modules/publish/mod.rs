use axum::Router;
use axum::routing::post;
use crate::state::AppState;
use axum::middleware;

pub mod dto;
pub mod handler;
pub mod service;

pub fn router(state: AppState) -> axum::Router<AppState> {
    Router::new()
        .route("/publish/{platform}", post(handler::publish_now))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
