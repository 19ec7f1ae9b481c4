//! Login, logout and password-reset routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use probmark_api_types::{LoginRequest, LoginResponse, PasswordResetConfirm, PasswordResetRequest};
use probmark_core::domain::DomainError;
use tracing::{info, warn};

use super::error::ApiError;
use super::extract::{ApiJson, CurrentUser};
use super::state::AppState;
use super::users::user_response;
use crate::auth::{AuthError, TokenPurpose};
use crate::password::{hash_password_blocking, verify_password_blocking};

pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/password-reset", post(request_password_reset))
        .route("/api/password-reset/confirm", post(confirm_password_reset))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::unauthorized("Invalid username or password");
    let user = state
        .users
        .find_by_username(&request.username)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
        return Err(invalid());
    }

    let issued = state.tokens.issue(user.id, TokenPurpose::Session)?;
    let marked_count = state.users.marked_count(user.id).await?;
    info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.claims.exp,
        user: user_response(user, marked_count),
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> StatusCode {
    state.tokens.revoke(&current.claims).await;
    info!(user_id = %current.user.id, "user logged out");
    StatusCode::NO_CONTENT
}

/// Always accepted, so the response does not reveal which addresses exist.
async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PasswordResetRequest>,
) -> Result<StatusCode, ApiError> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(DomainError::EmptyField("email").into());
    }

    if let Some(user) = state.users.find_by_email(email).await? {
        let issued = state.tokens.issue(user.id, TokenPurpose::PasswordReset)?;
        if let Err(err) = state.reset_notifier.send_reset(&user, &issued).await {
            warn!(user_id = %user.id, error = ?err, "failed to deliver password reset");
        }
    }

    Ok(StatusCode::ACCEPTED)
}

async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PasswordResetConfirm>,
) -> Result<StatusCode, ApiError> {
    if request.password.is_empty() {
        return Err(DomainError::EmptyField("password").into());
    }

    let claims = state
        .tokens
        .verify(&request.token, TokenPurpose::PasswordReset)
        .await?;
    if !state.tokens.revoke(&claims).await {
        return Err(AuthError::Revoked.into());
    }

    let password_hash = hash_password_blocking(request.password).await?;
    let committed = state
        .users
        .update_password(claims.user_id(), password_hash)
        .await?
        .ok_or(AuthError::Revoked)?;
    state.index_sync.apply(&committed.changes).await?;

    info!(user_id = %committed.value.id, "password reset");
    Ok(StatusCode::NO_CONTENT)
}
