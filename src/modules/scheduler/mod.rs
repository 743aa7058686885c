use axum::Router;
use axum::middleware;
use axum::routing::post;
use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod service;

pub fn router(state: AppState) -> axum::Router<AppState> {
    Router::new()
        .route("/publish", post(handler::trigger_publish).get(handler::manual_publish))
        .route("/instagram-poll", post(handler::trigger_poll).get(handler::manual_poll))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::cron::cron_guard,
        ))
}
