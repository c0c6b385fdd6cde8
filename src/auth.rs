use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Duration;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AccountKind, Session};

/// Claims
///
/// Payload of every bearer token. The token carries only the id of a server-side session
/// and the table it belongs to; identity is always re-resolved from storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (sub): the session id.
    pub sub: Uuid,
    /// Which credential table the session's account lives in.
    pub kind: AccountKind,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp). Equal to the session's `expires_at`.
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed or its signature does not verify")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// TokenService
///
/// Signs and verifies HS256 session tokens. Stateless apart from the key pair.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Lifetime applied to new sessions.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// issue
    ///
    /// Produces the signed token naming `session`. Expiry mirrors the session row.
    pub fn issue(&self, session: &Session) -> Result<String, TokenError> {
        let claims = Claims {
            sub: session.id,
            kind: session.kind,
            iat: session.created_at.timestamp().max(0) as usize,
            exp: session.expires_at.timestamp().max(0) as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// validate
    ///
    /// Verifies signature and expiry (no leeway) and returns the decoded claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

/// BearerToken
///
/// Pulls the raw token out of `Authorization: Bearer <token>`. Never rejects: a missing
/// or malformed header yields `None` and the authorization gate answers 401.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Ok(BearerToken(token))
    }
}
