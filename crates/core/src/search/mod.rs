//! Search index backends.
//!
//! A backend stores one [`IndexDocument`] per `(namespace, id)` and answers
//! paged multi-field match queries with ids in relevance order.

mod memory;
mod tokenizer;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DocId, IndexDocument};

pub use memory::MemoryIndex;
pub use tokenizer::tokenize;

/// Ids of one result window plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHits {
    pub ids: Vec<DocId>,
    pub total: u64,
}

impl QueryHits {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("search backend unavailable: {0}")]
    Unavailable(String),
    #[error("search backend timed out after {0} ms")]
    Timeout(u64),
    #[error("search backend rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid search backend response: {0}")]
    InvalidResponse(String),
}

impl IndexError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            IndexError::Unavailable(_) | IndexError::Timeout(_) => true,
            IndexError::Rejected { status, .. } => *status >= 500 || *status == 429,
            IndexError::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Replaces the whole document stored under `id`.
    async fn upsert(
        &self,
        namespace: &str,
        id: DocId,
        document: &IndexDocument,
    ) -> Result<(), IndexError>;

    /// Removes the document stored under `id`. Missing ids are not an error.
    async fn remove(&self, namespace: &str, id: DocId) -> Result<(), IndexError>;

    /// Matches `text` against every field, returning the window
    /// `[offset, offset + limit)` of the ranking.
    async fn query(
        &self,
        namespace: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> Result<QueryHits, IndexError>;
}
