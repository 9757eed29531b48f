//! Admin session authentication.
//!
//! The dashboard's identity provider is an external collaborator: it signs
//! session tokens (HS256) carrying the admin's email. This module validates
//! those tokens and enforces the configured admin allow-list — possession of
//! a valid token is not enough, the email claim must also be on the list.
//! Unauthenticated and non-allow-listed calls both receive 401.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::AppState;

/// Claim structure for session tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (admin email)
    pub email: String,        // Admin email, matched against the allow-list
    pub name: Option<String>, // Display name
    pub jti: String,          // Token ID
    pub iat: i64,             // Issued at time
    pub exp: i64,             // Expiration time
    pub iss: String,          // Issuer
    pub aud: String,          // Audience
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub session_secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_lifetime: Duration,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            session_secret: cfg.session_secret.clone(),
            issuer: cfg.auth_issuer.clone(),
            audience: cfg.auth_audience.clone(),
            session_lifetime: Duration::from_secs(cfg.session_expiration),
        }
    }
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session token expired")]
    ExpiredToken,

    #[error("Email is not authorized for admin access")]
    NotAllowListed,

    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Unauthorized".to_string(),
            ),
            Self::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Unauthorized".to_string(),
            ),
            Self::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_EXPIRED_TOKEN",
                "Session expired".to_string(),
            ),
            Self::NotAllowListed => (
                StatusCode::UNAUTHORIZED,
                "AUTH_NOT_ALLOWED",
                "Unauthorized".to_string(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Authenticated admin extracted from a validated session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub email: String,
    pub name: Option<String>,
    pub token_id: String,
}

/// Validates session tokens and enforces the admin allow-list
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    allowlist: HashSet<String>,
}

impl AuthService {
    pub fn new(config: AuthConfig, allowlist: HashSet<String>) -> Self {
        Self { config, allowlist }
    }

    /// Whether the email is on the admin allow-list (case-insensitive).
    pub fn is_allowlisted(&self, email: &str) -> bool {
        self.allowlist.contains(&email.trim().to_ascii_lowercase())
    }

    /// Issues a signed session token for the given admin email.
    ///
    /// Token minting normally lives with the identity provider; this exists
    /// for operational tooling and tests.
    pub fn issue_session(&self, email: &str, name: Option<&str>) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: email.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.session_lifetime.as_secs() as i64,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.session_secret.as_bytes()),
        )
        .map_err(|e| AuthError::InternalError(format!("Failed to sign session token: {}", e)))
    }

    /// Validates a session token's signature, expiry, issuer, and audience.
    pub fn validate_session(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.session_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken(e.to_string()),
        })
    }

    /// Full admin authorization: valid token AND allow-listed email.
    pub fn authorize(&self, token: &str) -> Result<AdminUser, AuthError> {
        let claims = self.validate_session(token)?;

        if !self.is_allowlisted(&claims.email) {
            debug!(email = %claims.email, "Rejected session for non-allow-listed email");
            return Err(AuthError::NotAllowListed);
        }

        Ok(AdminUser {
            email: claims.email,
            name: claims.name,
            token_id: claims.jti,
        })
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingAuth)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingAuth)?;

        app_state.auth.authorize(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_service() -> AuthService {
        let config = AuthConfig {
            session_secret: "unit-test-session-secret-that-is-long-enough-for-hs256-use-0001"
                .to_string(),
            issuer: "autoworx-api".to_string(),
            audience: "autoworx-admin".to_string(),
            session_lifetime: Duration::from_secs(3600),
        };
        let allowlist = ["shop@autoworx.ph".to_string()].into_iter().collect();
        AuthService::new(config, allowlist)
    }

    #[test]
    fn round_trips_a_session_token() {
        let service = test_service();
        let token = service
            .issue_session("shop@autoworx.ph", Some("Shop Admin"))
            .unwrap();

        let admin = service.authorize(&token).unwrap();
        assert_eq!(admin.email, "shop@autoworx.ph");
        assert_eq!(admin.name.as_deref(), Some("Shop Admin"));
    }

    #[test]
    fn rejects_non_allowlisted_email() {
        let service = test_service();
        let token = service.issue_session("intruder@example.com", None).unwrap();

        assert_matches!(service.authorize(&token), Err(AuthError::NotAllowListed));
    }

    #[test]
    fn allowlist_matching_is_case_insensitive() {
        let service = test_service();
        let token = service.issue_session("Shop@Autoworx.PH", None).unwrap();

        assert!(service.authorize(&token).is_ok());
    }

    #[test]
    fn rejects_garbage_tokens() {
        let service = test_service();
        assert_matches!(
            service.authorize("not-a-token"),
            Err(AuthError::InvalidToken(_))
        );
    }

    #[test]
    fn rejects_tokens_signed_with_a_different_secret() {
        let service = test_service();

        let other = AuthService::new(
            AuthConfig {
                session_secret: "a-completely-different-secret-also-long-enough-for-hs256-0002"
                    .to_string(),
                issuer: "autoworx-api".to_string(),
                audience: "autoworx-admin".to_string(),
                session_lifetime: Duration::from_secs(3600),
            },
            ["shop@autoworx.ph".to_string()].into_iter().collect(),
        );

        let token = other.issue_session("shop@autoworx.ph", None).unwrap();
        assert_matches!(service.authorize(&token), Err(AuthError::InvalidToken(_)));
    }
}
