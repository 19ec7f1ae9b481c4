//! Search-index wiring for the server.
//!
//! Writes reach the index only through [`IndexSync::apply`] with the
//! change-set of a committed transaction. Reads go through [`ProblemSearch`],
//! which re-ranks store rows into the index's relevance order.

mod client;
mod elasticsearch;
mod query;
mod sync;

use std::sync::Arc;

use probmark_core::search::{MemoryIndex, SearchIndex};
use tracing::info;

use crate::config::{SearchBackendKind, SearchSettings};

pub use client::{SearchClient, WriteOutcome};
pub use elasticsearch::ElasticsearchIndex;
pub use query::ProblemSearch;
pub use sync::{IndexSync, ReindexReport, SyncReport};

/// Creates the process-wide backend selected by `settings`.
pub fn build_backend(settings: &SearchSettings) -> anyhow::Result<Option<Arc<dyn SearchIndex>>> {
    let backend: Option<Arc<dyn SearchIndex>> = match settings.backend {
        SearchBackendKind::Elasticsearch => {
            info!(url = %settings.url, "using elasticsearch search backend");
            Some(Arc::new(ElasticsearchIndex::new(&settings.url, settings.timeout())?))
        }
        SearchBackendKind::Memory => {
            info!("using in-memory search backend");
            Some(Arc::new(MemoryIndex::new()))
        }
        SearchBackendKind::Disabled => {
            info!("search backend disabled, searches will return no results");
            None
        }
    };
    Ok(backend)
}
