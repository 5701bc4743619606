//! `AuthUser` extractor: pulls the bearer token from the request and validates it.

use axum::extract::{FromRequestParts, Query};
use axum::http::header;
use axum::http::request::Parts;
use serde::Deserialize;

use feedwire_auth::Claims;
use feedwire_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Token passed as a query parameter by clients that cannot set headers
/// (browser `EventSource`).
#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The presented bearer token.
    pub token: String,
    /// Its validated claims.
    pub claims: Claims,
}

impl AuthUser {
    /// Login of the caller.
    pub fn login(&self) -> &str {
        self.claims.login()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.jwt_decoder.decode(&token).await?;
        Ok(AuthUser { token, claims })
    }
}

/// The bearer token from the `Authorization` header, else the `token`
/// query parameter.
fn bearer_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AppError::unauthorized("Invalid Authorization header format"))?;
        return value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"));
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))
}
