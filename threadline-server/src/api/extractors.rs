//! Custom Axum extractors for request authentication.
//!
//! Provides `Identity`, the caller's user id. It is taken from an HS256
//! bearer token (`Authorization: Bearer <jwt>`, claim `id`) and falls back to
//! the configured anonymous id when the header is missing or the token does
//! not verify. Resolution never rejects a request.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use std::collections::HashSet;
use std::convert::Infallible;

use crate::config::runtime::AuthConfig;
use crate::state::AppState;

/// The resolved caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

#[derive(Debug, Deserialize)]
struct Claims {
    id: ClaimId,
}

/// Token issuers put either a string or a number in `id`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClaimId {
    Text(String),
    Number(i64),
}

impl ClaimId {
    fn into_user_id(self) -> String {
        match self {
            ClaimId::Text(id) => id,
            ClaimId::Number(id) => id.to_string(),
        }
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = state.config.auth.read().await;
        Ok(Identity(resolve_identity(&parts.headers, &auth)))
    }
}

/// Resolve the user id for a request's headers.
pub fn resolve_identity(headers: &HeaderMap, auth: &AuthConfig) -> String {
    let Some(token) = bearer_token(headers) else {
        return auth.fallback_user_id.clone();
    };

    let mut validation = Validation::new(Algorithm::HS256);
    // `exp` is honoured when present but not required
    validation.required_spec_claims = HashSet::new();

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims.id.into_user_id(),
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected, using fallback identity");
            auth.fallback_user_id.clone()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
