// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key authentication for developer routes.
//!
//! Clients send `Authorization: Api-Key <key>`.

use crate::error::AppError;
use crate::models::Developer;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authorization scheme keyword (matched case-insensitively).
pub const API_KEY_KEYWORD: &str = "Api-Key";

const MSG_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
const MSG_NO_CREDENTIALS: &str = "Invalid API key header. No credentials provided.";
const MSG_SPACES: &str = "Invalid API key header. API key string should not contain spaces.";
const MSG_BAD_CHARS: &str =
    "Invalid API key header. API key string should not contain invalid characters.";
const MSG_INVALID_KEY: &str = "Invalid API key.";

/// Developer authenticated by API key.
#[derive(Debug, Clone)]
pub struct AuthDeveloper {
    pub developer: Developer,
}

/// Extract the key from an Authorization header value.
pub fn parse_api_key_header(value: Option<&str>) -> Result<&str, AppError> {
    let failed = |msg: &str| AppError::AuthenticationFailed(msg.to_string());

    let parts: Vec<&str> = value.unwrap_or("").split_whitespace().collect();
    match parts.as_slice() {
        [keyword, ..] if !keyword.eq_ignore_ascii_case(API_KEY_KEYWORD) => {
            Err(failed(MSG_NOT_PROVIDED))
        }
        [] => Err(failed(MSG_NOT_PROVIDED)),
        [_] => Err(failed(MSG_NO_CREDENTIALS)),
        [_, key] => Ok(key),
        _ => Err(failed(MSG_SPACES)),
    }
}

/// Middleware that requires a valid API key for an active developer.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|h| h.to_str())
        .transpose()
        .map_err(|_| AppError::AuthenticationFailed(MSG_BAD_CHARS.to_string()))?;

    let api_key = parse_api_key_header(raw)?.to_string();

    let developer = state
        .db
        .get_active_developer_by_api_key(&api_key)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Rejected request with unknown or inactive API key");
            AppError::AuthenticationFailed(MSG_INVALID_KEY.to_string())
        })?;

    tracing::debug!(developer_id = %developer.id, "API key authenticated");
    request.extensions_mut().insert(AuthDeveloper { developer });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<&str, AppError>) -> String {
        match result {
            Err(AppError::AuthenticationFailed(msg)) => msg,
            other => panic!("expected authentication failure, got {:?}", other),
        }
    }

    #[test]
    fn test_parses_key() {
        assert_eq!(parse_api_key_header(Some("Api-Key abc123")).unwrap(), "abc123");
        assert_eq!(parse_api_key_header(Some("api-key   abc123 ")).unwrap(), "abc123");
        assert_eq!(parse_api_key_header(Some("API-KEY abc123")).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_or_other_scheme() {
        assert_eq!(message(parse_api_key_header(None)), MSG_NOT_PROVIDED);
        assert_eq!(message(parse_api_key_header(Some(""))), MSG_NOT_PROVIDED);
        assert_eq!(
            message(parse_api_key_header(Some("Bearer abc.def.ghi"))),
            MSG_NOT_PROVIDED
        );
    }

    #[test]
    fn test_keyword_without_key() {
        assert_eq!(message(parse_api_key_header(Some("Api-Key"))), MSG_NO_CREDENTIALS);
    }

    #[test]
    fn test_key_with_spaces() {
        assert_eq!(message(parse_api_key_header(Some("Api-Key abc 123"))), MSG_SPACES);
    }
}
