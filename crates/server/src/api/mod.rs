//! JSON API routes.

pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod problems;
pub mod state;
pub mod users;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use extract::{AdminAccess, CurrentUser};
pub use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(admin::create_admin_router())
        .merge(auth::create_auth_router())
        .merge(users::create_user_router())
        .merge(problems::create_problem_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
