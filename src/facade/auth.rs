//! Shared-secret request authentication (§4.G, §6): every private
//! endpoint requires an `X-Auth-Key` header matching the configured key.
//! Structured the same way the gateway codebase's `auth_middleware` is
//! (a `State`-extracting Axum middleware run before the handler), with
//! the Ed25519/timestamp-nonce machinery dropped since the facade has
//! no API-key database of its own (§1 Non-goals).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::types::ApiError;

#[derive(Clone)]
pub struct AuthState {
    pub required_key: Option<Arc<str>>,
}

impl AuthState {
    pub fn new(required_key: Option<String>) -> Self {
        Self {
            required_key: required_key.map(|k| k.into()),
        }
    }
}

pub async fn auth_middleware(
    State(auth): State<AuthState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &auth.required_key else {
        return Ok(next.run(request).await);
    };

    let supplied = request
        .headers()
        .get("x-auth-key")
        .and_then(|v| v.to_str().ok());

    match supplied {
        Some(key) if key == expected.as_ref() => Ok(next.run(request).await),
        Some(_) => Err(ApiError::unauthorized("invalid X-Auth-Key")),
        None => Err(ApiError::unauthorized("missing X-Auth-Key header")),
    }
}
