//! Shared-secret extractors for protected routes

use crate::error::ApiError;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use revise_core::TrackerError;
use serde::Deserialize;

const INVALID_TOKEN: &str = "Invalid or missing token";

/// Proof that the request carried the configured `?token=` secret
#[derive(Debug, Clone, Copy)]
pub struct SecretToken;

/// Proof that the request carried `Authorization: Bearer <cron secret>`
#[derive(Debug, Clone, Copy)]
pub struct CronSecret;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Compare a presented secret against the configured one. An unconfigured
/// secret rejects everything.
fn secret_matches(presented: Option<&str>, expected: Option<&str>) -> bool {
    match (presented, expected) {
        (Some(presented), Some(expected)) => {
            // Length check first, then a full scan without early exit
            presented.len() == expected.len()
                && presented
                    .bytes()
                    .zip(expected.bytes())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
        }
        _ => false,
    }
}

fn unauthorized() -> ApiError {
    ApiError(TrackerError::Unauthorized(INVALID_TOKEN.to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for SecretToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token);

        if secret_matches(token.as_deref(), state.config.secret_token.as_deref()) {
            Ok(SecretToken)
        } else {
            Err(unauthorized())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CronSecret {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        if secret_matches(token, state.config.cron_secret.as_deref()) {
            Ok(CronSecret)
        } else {
            Err(unauthorized())
        }
    }
}
