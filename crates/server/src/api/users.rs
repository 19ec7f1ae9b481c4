//! Registration, profile, search and marking routes.
//!
//! Everything except registration needs a session token. Marks can only be
//! changed by their owner.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use probmark_api_types::{
    MarkResponse, ProblemResponse, RegisterRequest, SearchResponse, UserResponse,
};
use probmark_core::domain::{DomainError, PageRequest, ProblemId};
use serde::Deserialize;
use tracing::info;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use super::state::AppState;
use crate::password::hash_password_blocking;
use crate::repository::{NewUser, ProblemRecord, UserRecord, unique_violation};

pub fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", post(register))
        .route("/api/users/{username}", get(get_user))
        .route("/api/users/{username}/search", get(search_problems))
        .route("/api/users/{username}/marked", get(marked_problems))
        .route(
            "/api/users/{username}/marked/{problem_id}",
            post(mark_problem).delete(unmark_problem),
        )
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    page: Option<u64>,
}

fn username_taken() -> ApiError {
    ApiError::conflict("username_taken", "Please use a different username.")
}

fn email_taken() -> ApiError {
    ApiError::conflict("email_taken", "Please use a different email address.")
}

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() {
        return Err(DomainError::EmptyField("username").into());
    }
    if email.is_empty() {
        return Err(DomainError::EmptyField("email").into());
    }
    if request.password.is_empty() {
        return Err(DomainError::EmptyField("password").into());
    }

    if state.users.find_by_username(username).await?.is_some() {
        return Err(username_taken());
    }
    if state.users.find_by_email(email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password_blocking(request.password).await?;
    // A concurrent registration can still win between the checks and the insert.
    let committed = state
        .users
        .create(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await
        .map_err(|err| match unique_violation(&err) {
            Some(message) if message.contains("email") => email_taken(),
            Some(_) => username_taken(),
            None => err.into(),
        })?;
    state.index_sync.apply(&committed.changes).await?;

    let user = committed.value;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user_response(user, 0))))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = find_user(&state, &username).await?;
    let marked_count = state.users.marked_count(user.id).await?;

    Ok(Json(user_response(user, marked_count)))
}

async fn search_problems(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    ApiPath(username): ApiPath<String>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    find_user(&state, &username).await?;
    let text = params.q.trim();
    if text.is_empty() {
        return Err(DomainError::EmptyField("q").into());
    }
    let page = PageRequest::new(params.page.unwrap_or(1), state.problems_per_page)?;

    let results = state.problem_search.search(text, page).await?;

    Ok(Json(SearchResponse {
        total: results.total,
        page: page.page(),
        per_page: page.per_page(),
        last_page: results.last_page(),
        next_page: results.next_page(),
        prev_page: results.prev_page(),
        problems: results.items.into_iter().map(ProblemResponse::from).collect(),
    }))
}

async fn marked_problems(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<Vec<ProblemResponse>>, ApiError> {
    let user = find_user(&state, &username).await?;
    let problems = state.users.marked_problems(user.id).await?;

    Ok(Json(problems.into_iter().map(ProblemResponse::from).collect()))
}

async fn mark_problem(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ApiPath((username, problem_id)): ApiPath<(String, i32)>,
) -> Result<Json<MarkResponse>, ApiError> {
    current.require_self(&username)?;
    let problem = find_problem(&state, ProblemId::new(problem_id)).await?;
    let user = current.user;
    let changed = state.users.mark(user.id, problem.id).await?;

    info!(user_id = %user.id, problem_id = %problem.id, changed, "problem marked");
    Ok(Json(MarkResponse {
        problem_id: problem.id.into_inner(),
        marked: true,
        changed,
    }))
}

async fn unmark_problem(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    ApiPath((username, problem_id)): ApiPath<(String, i32)>,
) -> Result<Json<MarkResponse>, ApiError> {
    current.require_self(&username)?;
    let problem = find_problem(&state, ProblemId::new(problem_id)).await?;
    let user = current.user;
    let changed = state.users.unmark(user.id, problem.id).await?;

    info!(user_id = %user.id, problem_id = %problem.id, changed, "problem unmarked");
    Ok(Json(MarkResponse {
        problem_id: problem.id.into_inner(),
        marked: false,
        changed,
    }))
}

async fn find_user(state: &AppState, username: &str) -> Result<UserRecord, ApiError> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| ApiError::user_not_found(username))
}

async fn find_problem(state: &AppState, problem_id: ProblemId) -> Result<ProblemRecord, ApiError> {
    state
        .problems
        .find_by_id(problem_id)
        .await?
        .ok_or_else(|| ApiError::problem_not_found(problem_id))
}

pub(super) fn user_response(user: UserRecord, marked_count: u64) -> UserResponse {
    UserResponse {
        id: user.id.into_inner(),
        username: user.username,
        email: user.email,
        marked_count,
    }
}
