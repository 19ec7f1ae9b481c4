use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use probmark_core::domain::{DocId, IndexDocument, PageRequest};
use probmark_core::search::{IndexError, QueryHits, SearchIndex};
use tracing::warn;

use crate::config::{FailurePolicy, SearchSettings};

/// What became of a write sent through [`SearchClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The backend acknowledged the write.
    Applied,
    /// No backend is configured.
    Disabled,
    /// The backend failed and the fail-open policy dropped the write.
    Dropped,
}

/// Process-wide handle to the search backend.
///
/// Applies the configured timeout, retry and failure policy to every call.
/// Without a backend every operation is a no-op and queries match nothing.
#[derive(Clone)]
pub struct SearchClient {
    backend: Option<Arc<dyn SearchIndex>>,
    policy: FailurePolicy,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl SearchClient {
    pub fn new(backend: Option<Arc<dyn SearchIndex>>, settings: &SearchSettings) -> Self {
        Self {
            backend,
            policy: settings.failure_policy,
            timeout: settings.timeout(),
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, &SearchSettings::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub async fn add_to_index(
        &self,
        namespace: &str,
        id: DocId,
        document: &IndexDocument,
    ) -> Result<WriteOutcome, IndexError> {
        let Some(backend) = &self.backend else {
            return Ok(WriteOutcome::Disabled);
        };

        let result = self
            .with_retry("upsert", move || backend.upsert(namespace, id, document))
            .await;
        self.settle_write("upsert", namespace, result)
    }

    pub async fn remove_from_index(
        &self,
        namespace: &str,
        id: DocId,
    ) -> Result<WriteOutcome, IndexError> {
        let Some(backend) = &self.backend else {
            return Ok(WriteOutcome::Disabled);
        };

        let result = self
            .with_retry("remove", move || backend.remove(namespace, id))
            .await;
        self.settle_write("remove", namespace, result)
    }

    pub async fn query_index(
        &self,
        namespace: &str,
        text: &str,
        page: PageRequest,
    ) -> Result<QueryHits, IndexError> {
        let Some(backend) = &self.backend else {
            return Ok(QueryHits::empty());
        };

        let result = self
            .with_retry("query", move || {
                backend.query(namespace, text, page.offset(), page.limit())
            })
            .await;
        self.settle("query", namespace, result)
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, IndexError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IndexError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(IndexError::Timeout(self.timeout.as_millis() as u64)),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(operation, attempt, error = %err, "search backend call failed, retrying");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                other => return other,
            }
        }
    }

    fn settle_write(
        &self,
        operation: &'static str,
        namespace: &str,
        result: Result<(), IndexError>,
    ) -> Result<WriteOutcome, IndexError> {
        let applied = result.is_ok();
        self.settle(operation, namespace, result)?;

        Ok(if applied {
            WriteOutcome::Applied
        } else {
            WriteOutcome::Dropped
        })
    }

    fn settle<T: Default>(
        &self,
        operation: &'static str,
        namespace: &str,
        result: Result<T, IndexError>,
    ) -> Result<T, IndexError> {
        match (result, self.policy) {
            (Ok(value), _) => Ok(value),
            (Err(err), FailurePolicy::FailOpen) => {
                warn!(operation, namespace, error = %err, "search backend call failed, ignoring");
                Ok(T::default())
            }
            (Err(err), FailurePolicy::FailClosed) => Err(err),
        }
    }
}
