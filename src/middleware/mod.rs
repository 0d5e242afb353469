use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Caller identity handed to the booking engines.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

// Token payload shape shared with the login service: { user: {...}, exp }
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: ClaimsUser,
    pub exp: usize,
}

impl Claims {
    /// Sign an HS256 token. Login lives in another service; this is for
    /// tooling and tests.
    pub fn issue(
        user: ClaimsUser,
        secret: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        encode(
            &Header::default(),
            &Claims { user, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }
}

fn verify(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

// Bearer token extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = verify(token.trim(), &state.config.jwt.secret).map_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

        if claims.user.id <= 0 {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthUser {
            user_id: claims.user.id,
        })
    }
}
