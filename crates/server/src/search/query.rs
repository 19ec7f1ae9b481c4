use std::sync::Arc;

use anyhow::Result;
use probmark_core::domain::{Indexable, PageRequest, ProblemId, SearchPage, rerank_by_ids};
use tracing::debug;

use super::SearchClient;
use crate::repository::{PROBLEM_NAMESPACE, ProblemRecord, ProblemRepository};

/// Full-text problem search: index for matching and ranking, store for rows.
#[derive(Clone)]
pub struct ProblemSearch {
    client: Arc<SearchClient>,
    problems: Arc<dyn ProblemRepository>,
}

impl ProblemSearch {
    pub fn new(client: Arc<SearchClient>, problems: Arc<dyn ProblemRepository>) -> Self {
        Self { client, problems }
    }

    /// Returns one page of problems in the index's relevance order.
    ///
    /// Ids the store no longer has are dropped; `total` stays the index
    /// count.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, text: &str, page: PageRequest) -> Result<SearchPage<ProblemRecord>> {
        let hits = self.client.query_index(PROBLEM_NAMESPACE, text, page).await?;
        if hits.total == 0 {
            return Ok(SearchPage::empty(page));
        }

        let problem_ids: Vec<ProblemId> = hits
            .ids
            .iter()
            .filter_map(|id| ProblemId::try_from(*id).ok())
            .collect();
        let rows = self.problems.find_by_ids(&problem_ids).await?;
        let fetched = rows.len();
        let items = rerank_by_ids(&hits.ids, rows, ProblemRecord::index_id);

        if fetched < hits.ids.len() {
            debug!(
                expected = hits.ids.len(),
                fetched,
                "search index references problems missing from the store"
            );
        }

        Ok(SearchPage {
            items,
            total: hits.total,
            request: page,
        })
    }
}
