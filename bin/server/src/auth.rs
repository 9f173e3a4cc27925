//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs signed with the configured secret. An access token
//! authenticates API calls; a refresh token can only be exchanged for a new
//! token pair at `/users/{id}/refresh`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use blogmate::ownership::{Caller, Role};
use blogmate::users::User;
use blogmate::{BlogError, EntityId, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Access token lifetime.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

/// Access and refresh token handed out on login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Signs and checks tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    fn sign(&self, user: &User, kind: TokenKind, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.user_id.to_hex(),
            role: user.role,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| BlogError::internal(format!("token signing failed: {}", e)))
    }

    pub fn issue(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(
                user,
                TokenKind::Access,
                Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            )?,
            refresh_token: self.sign(
                user,
                TokenKind::Refresh,
                Duration::days(REFRESH_TOKEN_TTL_DAYS),
            )?,
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_TTL_MINUTES * 60,
        })
    }

    /// Decodes a token and checks it is of the expected kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => BlogError::TokenExpired,
                _ => {
                    debug!("Rejected bearer token: {}", e);
                    BlogError::InvalidToken
                }
            })?;
        if claims.kind != expected {
            return Err(BlogError::InvalidToken);
        }
        Ok(claims)
    }

    /// Resolves an access token to the caller it names.
    pub fn caller(&self, token: &str) -> Result<Caller> {
        let claims = self.verify(token, TokenKind::Access)?;
        let user_id = EntityId::parse(&claims.sub).map_err(|_| BlogError::InvalidToken)?;
        Ok(Caller::new(user_id, claims.role))
    }
}

/// Authenticated caller extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| BlogError::unauthorized("missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BlogError::unauthorized("missing bearer token"))?;

        Ok(AuthUser(state.tokens.caller(token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogmate::users::AccountStatus;

    fn user(role: Role) -> User {
        User {
            user_id: EntityId::new(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            role,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_resolves_caller() {
        let issuer = TokenIssuer::new(b"0123456789abcdef0123");
        let alice = user(Role::Admin);
        let pair = issuer.issue(&alice).unwrap();

        let caller = issuer.caller(&pair.access_token).unwrap();
        assert_eq!(caller.user_id, alice.user_id);
        assert!(caller.is_admin());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let issuer = TokenIssuer::new(b"0123456789abcdef0123");
        let pair = issuer.issue(&user(Role::User)).unwrap();

        assert!(matches!(
            issuer.caller(&pair.refresh_token),
            Err(BlogError::InvalidToken)
        ));
        assert!(issuer.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = TokenIssuer::new(b"0123456789abcdef0123");
        let other = TokenIssuer::new(b"fedcba9876543210fedc");
        let pair = other.issue(&user(Role::User)).unwrap();

        assert!(matches!(
            issuer.caller(&pair.access_token),
            Err(BlogError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let issuer = TokenIssuer::new(b"0123456789abcdef0123");
        let token = issuer
            .sign(&user(Role::User), TokenKind::Access, Duration::seconds(-120))
            .unwrap();
        assert!(matches!(issuer.caller(&token), Err(BlogError::TokenExpired)));
    }
}
