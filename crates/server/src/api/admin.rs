//! Health and maintenance routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use probmark_api_types::{HealthCheckResponse, ReindexResponse};

use super::error::ApiError;
use super::extract::AdminAccess;
use super::state::AppState;
use crate::repository::PROBLEM_NAMESPACE;

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/admin/reindex", post(reindex))
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}

/// Rebuilds the problem namespace from the store. Repairs an index left
/// stale by a crash between commit and sync. `failed` counts rows the
/// backend did not take under the fail-open policy.
async fn reindex(
    State(state): State<Arc<AppState>>,
    _admin: AdminAccess,
) -> Result<Json<ReindexResponse>, ApiError> {
    let report = state
        .index_sync
        .reindex_problems(state.problems.as_ref(), state.reindex_batch_size)
        .await?;

    Ok(Json(ReindexResponse {
        namespace: PROBLEM_NAMESPACE.to_string(),
        indexed: report.indexed,
        failed: report.failed,
    }))
}
