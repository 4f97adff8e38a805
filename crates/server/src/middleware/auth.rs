//! Authentication extractors for bearer-token requests.
//!
//! Token issuance lives with the external identity provider; this module
//! only validates signatures and expiry, then exposes the resulting
//! [`Principal`]. Handlers never see raw credentials.
//!
//! WebSocket upgrades cannot carry an `Authorization` header from a
//! browser, so the realtime route validates an `access_token` query
//! parameter through the same [`decode_principal`] path.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pantry_core::{Principal, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// Claims expected in a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user id (UUID).
    pub sub: String,
    pub email: String,
    pub name: String,
    /// Expiry, seconds since epoch.
    pub exp: usize,
}

/// Why a token failed validation. Collapsed to 401 at the boundary; the
/// variants exist for logs.
#[derive(Debug, Error)]
pub enum AuthTokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("invalid subject: {0}")]
    BadSubject(#[from] pantry_core::types::id::IdParseError),
}

/// Validate a bearer token and extract the principal it asserts.
///
/// # Errors
///
/// Returns [`AuthTokenError`] for a bad signature, expired token, or a
/// subject that is not a UUID.
pub fn decode_principal(token: &str, secret: &SecretString) -> Result<Principal, AuthTokenError> {
    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let data = decode::<Claims>(token, &key, &validation)?;

    Ok(Principal::new(
        UserId::parse(&data.claims.sub)?,
        data.claims.email,
        data.claims.name,
    ))
}

fn extract_bearer(header: Option<&HeaderValue>) -> Option<&str> {
    let value = header?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(principal): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", principal.name)
/// }
/// ```
pub struct RequireAuth(pub Principal);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts.headers.get(header::AUTHORIZATION))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

        let principal =
            decode_principal(token, &state.config().jwt_secret).map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                AppError::Unauthorized("invalid bearer token".to_owned())
            })?;

        crate::error::set_sentry_user(&principal.id, Some(&principal.email));
        Ok(Self(principal))
    }
}

/// Mint a signed token for a principal. Test support; production tokens
/// come from the identity provider.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn issue_token(principal: &Principal, secret: &SecretString, ttl_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
    let claims = Claims {
        sub: principal.id.to_string(),
        email: principal.email.clone(),
        name: principal.name.clone(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .unwrap_or_else(|err| panic!("token encoding cannot fail: {err}"))
}
