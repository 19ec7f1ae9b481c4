//! Shared application state.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::{LogResetNotifier, ResetNotifier, TokenService};
use crate::config::ServerConfig;
use crate::repository::{
    ProblemRepository, SeaOrmProblemRepository, SeaOrmUserRepository, UserRepository,
};
use crate::search::{IndexSync, ProblemSearch, SearchClient};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub problems: Arc<dyn ProblemRepository>,
    pub users: Arc<dyn UserRepository>,
    pub search_client: Arc<SearchClient>,
    pub index_sync: IndexSync,
    pub problem_search: ProblemSearch,
    pub tokens: Arc<TokenService>,
    pub reset_notifier: Arc<dyn ResetNotifier>,
    pub admin_token: Option<String>,
    pub problems_per_page: u64,
    pub reindex_batch_size: u64,
}

impl AppState {
    pub fn new(db: DatabaseConnection, search_client: SearchClient, config: &ServerConfig) -> Self {
        let mut state = Self::from_parts(
            Arc::new(SeaOrmProblemRepository::new(db.clone())),
            Arc::new(SeaOrmUserRepository::new(db)),
            Arc::new(search_client),
            Arc::new(TokenService::from_settings(&config.auth)),
            config.problems_per_page,
            config.search.reindex_batch_size,
        );
        state.reset_notifier = Arc::new(LogResetNotifier::new(config.auth.reset_url.clone()));
        state.admin_token = config.auth.admin_token.clone();
        state
    }

    pub fn from_parts(
        problems: Arc<dyn ProblemRepository>,
        users: Arc<dyn UserRepository>,
        search_client: Arc<SearchClient>,
        tokens: Arc<TokenService>,
        problems_per_page: u64,
        reindex_batch_size: u64,
    ) -> Self {
        Self {
            index_sync: IndexSync::new(search_client.clone()),
            problem_search: ProblemSearch::new(search_client.clone(), problems.clone()),
            problems,
            users,
            search_client,
            tokens,
            reset_notifier: Arc::new(LogResetNotifier::new(String::new())),
            admin_token: None,
            problems_per_page,
            reindex_batch_size,
        }
    }

    pub fn with_reset_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.reset_notifier = notifier;
        self
    }
}
