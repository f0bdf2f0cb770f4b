// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware and token issuance.

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie checked before the Authorization header.
pub const AUTH_COOKIE: &str = "fitness_token";

/// Distinguishes short-lived access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

/// Middleware that requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(AUTH_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let claims = decode_token(&token, &state.config.jwt_signing_key, TokenType::Access)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        username: claims.username,
    });

    Ok(next.run(request).await)
}

/// Decode and validate a token of the expected type.
pub fn decode_token(
    token: &str,
    signing_key: &[u8],
    expected: TokenType,
) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;

    if token_data.claims.token_type != expected {
        return Err(AppError::InvalidToken);
    }
    Ok(token_data.claims)
}

/// Create a signed JWT.
pub fn create_jwt(
    user_id: &str,
    username: &str,
    token_type: TokenType,
    lifetime: chrono::Duration,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        token_type,
        iat: now,
        exp: now + lifetime.num_seconds().max(0) as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Access and refresh token pair returned on login and registration.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Issue a fresh token pair for a user.
pub fn issue_token_pair(user: &User, config: &Config) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access: issue_access_token(&user.id, &user.username, config)?,
        refresh: create_jwt(
            &user.id,
            &user.username,
            TokenType::Refresh,
            chrono::Duration::days(config.refresh_token_ttl_days),
            &config.jwt_signing_key,
        )?,
    })
}

/// Issue an access token.
pub fn issue_access_token(user_id: &str, username: &str, config: &Config) -> anyhow::Result<String> {
    create_jwt(
        user_id,
        username,
        TokenType::Access,
        chrono::Duration::minutes(config.access_token_ttl_minutes),
        &config.jwt_signing_key,
    )
}
