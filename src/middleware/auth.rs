use crate::common::response::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims of the session token issued by the login service. `sub` is the
/// user id that owns content and platform credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract token from header
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or_else(|| ApiError::new("Unauthorized: Missing or invalid token", StatusCode::UNAUTHORIZED))?;

    // 2. Verify JWT
    let claims = decode::<TokenClaims>(
        &token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::new("Unauthorized: Invalid token signature", StatusCode::UNAUTHORIZED))?
    .claims;

    // 3. Inject claims into request extensions
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
