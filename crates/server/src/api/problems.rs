//! Problem CRUD. Every write replays its change-set into the search index.
//! Writes need the admin token when one is configured.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use probmark_api_types::{ProblemRequest, ProblemResponse};
use probmark_core::domain::{DomainError, ProblemId};
use tracing::info;

use super::error::ApiError;
use super::extract::{AdminAccess, ApiJson, ApiPath};
use super::state::AppState;
use crate::repository::{NewProblem, ProblemRecord, unique_violation};

pub fn create_problem_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/problems", post(create_problem))
        .route(
            "/api/problems/{problem_id}",
            get(get_problem).put(update_problem).delete(delete_problem),
        )
}

impl From<ProblemRecord> for ProblemResponse {
    fn from(record: ProblemRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            problem_name: record.problem_name,
            problem_link: record.problem_link,
            keywords: record.keywords,
            tags: record.tags,
            platform: record.platform,
        }
    }
}

fn new_problem(request: ProblemRequest) -> Result<NewProblem, DomainError> {
    let problem_name = request.problem_name.trim().to_string();
    let problem_link = request.problem_link.trim().to_string();
    if problem_name.is_empty() {
        return Err(DomainError::EmptyField("problem_name"));
    }
    if problem_link.is_empty() {
        return Err(DomainError::EmptyField("problem_link"));
    }

    Ok(NewProblem {
        problem_name,
        problem_link,
        keywords: request.keywords,
        tags: request.tags,
        platform: request.platform,
    })
}

fn link_taken(problem_link: &str) -> ApiError {
    ApiError::conflict(
        "problem_link_taken",
        format!("A problem with link {problem_link} already exists."),
    )
}

/// Maps the store's unique-link violation, which a concurrent write can
/// trigger after the pre-check passed, to the same conflict.
fn link_conflict(problem_link: &str) -> impl FnOnce(anyhow::Error) -> ApiError + '_ {
    move |err| {
        if unique_violation(&err).is_some() {
            link_taken(problem_link)
        } else {
            err.into()
        }
    }
}

async fn create_problem(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    ApiJson(request): ApiJson<ProblemRequest>,
) -> Result<(StatusCode, Json<ProblemResponse>), ApiError> {
    let new_problem = new_problem(request)?;
    let problem_link = new_problem.problem_link.clone();
    if state.problems.find_by_link(&problem_link).await?.is_some() {
        return Err(link_taken(&problem_link));
    }

    let committed = state
        .problems
        .create(new_problem)
        .await
        .map_err(link_conflict(&problem_link))?;
    state.index_sync.apply(&committed.changes).await?;

    info!(problem_id = %committed.value.id, "problem created");
    Ok((StatusCode::CREATED, Json(committed.value.into())))
}

async fn get_problem(
    State(state): State<Arc<AppState>>,
    ApiPath(problem_id): ApiPath<i32>,
) -> Result<Json<ProblemResponse>, ApiError> {
    let problem_id = ProblemId::new(problem_id);
    let problem = state
        .problems
        .find_by_id(problem_id)
        .await?
        .ok_or_else(|| ApiError::problem_not_found(problem_id))?;

    Ok(Json(problem.into()))
}

async fn update_problem(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    ApiPath(problem_id): ApiPath<i32>,
    ApiJson(request): ApiJson<ProblemRequest>,
) -> Result<Json<ProblemResponse>, ApiError> {
    let problem_id = ProblemId::new(problem_id);
    let update = new_problem(request)?;
    let problem_link = update.problem_link.clone();
    if let Some(existing) = state.problems.find_by_link(&problem_link).await? {
        if existing.id != problem_id {
            return Err(link_taken(&problem_link));
        }
    }

    let committed = state
        .problems
        .update(problem_id, update)
        .await
        .map_err(link_conflict(&problem_link))?
        .ok_or_else(|| ApiError::problem_not_found(problem_id))?;
    state.index_sync.apply(&committed.changes).await?;

    info!(problem_id = %problem_id, "problem updated");
    Ok(Json(committed.value.into()))
}

async fn delete_problem(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
    ApiPath(problem_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    let problem_id = ProblemId::new(problem_id);
    let committed = state
        .problems
        .delete(problem_id)
        .await?
        .ok_or_else(|| ApiError::problem_not_found(problem_id))?;
    state.index_sync.apply(&committed.changes).await?;

    info!(problem_id = %problem_id, "problem deleted");
    Ok(StatusCode::NO_CONTENT)
}
