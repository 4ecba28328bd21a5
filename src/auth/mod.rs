//! Bearer-token authentication for the HTTP API.
//!
//! The revealer is an internal operator service, so auth is a single shared
//! token checked on every `/api` request. Tokens are compared by SHA-256
//! digest; the plaintext is never stored.
//!
//! # Configuration
//!
//! - `AUTH_MODE`: `required` (default) or `disabled` for development
//! - `API_AUTH_TOKEN`: the operator bearer token

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::api::error::{ApiError, ErrorCode};

/// Validation errors for incoming credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingAuth,
    InvalidToken,
}

/// Validates bearer tokens against the configured operator token.
pub struct TokenValidator {
    token_hash: String,
}

impl TokenValidator {
    pub fn new(token: &str) -> Self {
        Self {
            token_hash: Self::hash_token(token),
        }
    }

    /// Hash a token for storage/comparison.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Authenticate a request's `Authorization` header.
    pub fn validate(&self, auth_header: Option<&str>) -> Result<(), AuthError> {
        let header = auth_header.ok_or(AuthError::MissingAuth)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingAuth)?;

        if Self::hash_token(token) == self.token_hash {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Authentication middleware configuration/state.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub validator: Option<Arc<TokenValidator>>,
    /// If false, requests are treated as fully authorized (dev mode).
    pub require_auth: bool,
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.require_auth {
        let auth_header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let result = match &state.validator {
            Some(validator) => validator.validate(auth_header),
            None => Err(AuthError::MissingAuth),
        };

        if let Err(e) = result {
            return auth_error_response(e);
        }
    }

    next.run(request).await
}

/// Convert auth error to HTTP response
fn auth_error_response(error: AuthError) -> Response {
    let api_error = match error {
        AuthError::MissingAuth => ApiError::new(ErrorCode::AuthRequired, "Missing bearer token"),
        AuthError::InvalidToken => ApiError::new(ErrorCode::InvalidToken, "Invalid bearer token"),
    };
    api_error.into_response()
}
