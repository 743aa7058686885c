use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use crate::common::upload::MAX_VIDEO_BYTES;
use crate::state::AppState;
use axum::middleware;
use tower_http::limit::RequestBodyLimitLayer;

pub mod handler;

// Multipart framing on top of the largest accepted file.
const BODY_LIMIT: usize = MAX_VIDEO_BYTES + 1024 * 1024;

pub fn router(state: AppState) -> axum::Router<AppState> {
    Router::new()
        .route("/media", post(handler::upload_media))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
