//! Request extractors whose rejections render as [`ErrorResponse`] JSON.
//!
//! [`ErrorResponse`]: probmark_api_types::ErrorResponse

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::{AuthError, Claims, TokenPurpose};
use crate::repository::UserRecord;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The user behind a valid session token.
pub struct CurrentUser {
    pub user: UserRecord,
    pub claims: Claims,
}

impl CurrentUser {
    /// Rejects requests acting on another user's data.
    pub fn require_self(&self, username: &str) -> Result<(), ApiError> {
        if self.user.username == username {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Signed in as {}, not {username}.",
                self.user.username
            )))
        }
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(ApiError::missing_token)?;
        let claims = state.tokens.verify(token, TokenPurpose::Session).await?;
        let user = state
            .users
            .find_by_id(claims.user_id())
            .await?
            .ok_or(AuthError::Revoked)?;

        Ok(Self { user, claims })
    }
}

/// Guards problem writes and maintenance routes with the configured admin
/// token. Passes every request when no admin token is configured.
pub struct AdminAccess;

impl FromRequestParts<Arc<AppState>> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Ok(Self);
        };

        let token = bearer_token(parts).ok_or_else(ApiError::missing_token)?;
        if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(Self)
        } else {
            Err(ApiError::forbidden("Admin token required."))
        }
    }
}
