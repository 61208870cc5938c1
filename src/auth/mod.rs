//! Authentication and role handling
//!
//! The auth collaborator supplies a signed JWT; this module verifies it and
//! produces a typed identity (`AuthenticatedUser`) carrying the caller id,
//! email and role. Handlers gate on roles explicitly instead of reading an
//! untyped claims map.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Caller role, as issued by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Investor,
    Borrower,
    FieldOfficer,
    FieldValidator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Investor => "investor",
            UserRole::Borrower => "borrower",
            UserRole::FieldOfficer => "field_officer",
            UserRole::FieldValidator => "field_validator",
        }
    }
}

/// JWT claims carried by access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
}

/// JWT secret newtype so the extractor can pull it out of the app state.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Issue a token for the given identity. Used by tests and operational
/// tooling; token issuance itself belongs to the auth collaborator.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    role: UserRole,
    ttl_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: Utc::now().timestamp() + ttl_seconds,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Fail with `Forbidden` unless the caller holds one of the given roles.
    pub fn require_any(&self, roles: &[UserRole]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        Err(ApiError::Forbidden(format!(
            "requires one of: {}",
            roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    JwtSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                    .into_response()
                })?;

        let JwtSecret(secret) = JwtSecret::from_ref(state);

        let claims = verify_token(bearer.token(), &secret).map_err(|e| {
            let message = if e.to_string().contains("expired") {
                "Token has expired"
            } else {
                "Invalid token"
            };
            ApiError::Unauthorized(message.to_string()).into_response()
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            ApiError::Unauthorized("Invalid user ID in token".to_string()).into_response()
        })?;

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token =
            issue_token("secret", user_id, "inv@x.io", UserRole::Investor, 3600).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "inv@x.io");
        assert_eq!(claims.role, UserRole::Investor);
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let token =
            issue_token("secret", Uuid::new_v4(), "inv@x.io", UserRole::Investor, 3600).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token =
            issue_token("secret", Uuid::new_v4(), "inv@x.io", UserRole::Investor, -10).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn test_require_any() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "officer@x.io".into(),
            role: UserRole::FieldOfficer,
        };
        assert!(user
            .require_any(&[UserRole::FieldOfficer, UserRole::Admin])
            .is_ok());
        assert!(user.require_any(&[UserRole::Investor]).is_err());
    }
}
