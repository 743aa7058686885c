use crate::common::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use url::form_urlencoded;

/// Guards the trigger endpoints with the shared cron secret, taken from a
/// `Bearer` header or, for manual runs, a `secret` query parameter.
pub async fn cron_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    let presented = bearer.or_else(|| {
        req.uri().query().and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "secret")
                .map(|(_, value)| value.into_owned())
        })
    });

    match presented {
        Some(secret) if secrets_match(&secret, &state.config.cron_secret) => Ok(next.run(req).await),
        Some(_) => Err(AppError::Auth("Invalid cron secret".to_string())),
        None => Err(AppError::Auth("Missing cron secret".to_string())),
    }
}

fn secrets_match(presented: &str, expected: &str) -> bool {
    if expected.is_empty() || presented.len() != expected.len() {
        return false;
    }
    presented
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
