#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use probmark_core::domain::{Committed, DocId, IndexDocument, ProblemId};
use probmark_core::search::{IndexError, MemoryIndex, QueryHits, SearchIndex};
use probmark_server::auth::{IssuedToken, ResetNotifier};
use probmark_server::config::{FailurePolicy, SearchSettings};
use probmark_server::db::connect_and_migrate;
use probmark_server::repository::{
    NewProblem, ProblemRecord, ProblemRepository, SeaOrmProblemRepository, UpdateProblem,
    UserRecord,
};
use probmark_server::search::SearchClient;
use sea_orm::DatabaseConnection;

pub async fn setup_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("in-memory database should migrate")
}

pub fn settings(policy: FailurePolicy) -> SearchSettings {
    SearchSettings {
        failure_policy: policy,
        max_retries: 0,
        retry_backoff_ms: 1,
        timeout_ms: 1_000,
        ..SearchSettings::default()
    }
}

pub fn client_for(backend: Arc<dyn SearchIndex>, policy: FailurePolicy) -> Arc<SearchClient> {
    Arc::new(SearchClient::new(Some(backend), &settings(policy)))
}

pub fn new_problem(n: usize, keywords: &str) -> NewProblem {
    NewProblem {
        problem_name: format!("Problem {n}"),
        problem_link: format!("https://judge.example.com/problem/{n}"),
        keywords: keywords.to_string(),
        tags: "implementation".to_string(),
        platform: "codeforces".to_string(),
    }
}

/// Inserts `count` problems without touching the search index.
pub async fn seed_problems(
    repo: &SeaOrmProblemRepository,
    count: usize,
    keywords: &str,
) -> Vec<ProblemRecord> {
    let mut records = Vec::with_capacity(count);
    for n in 1..=count {
        let committed = repo
            .create(new_problem(n, keywords))
            .await
            .expect("problem insert should succeed");
        records.push(committed.value);
    }
    records
}

pub fn memory_index() -> Arc<MemoryIndex> {
    Arc::new(MemoryIndex::new())
}

/// Returns a fixed ranking for every query and accepts all writes.
pub struct FixedHitsIndex {
    hits: QueryHits,
}

impl FixedHitsIndex {
    pub fn new(ids: Vec<DocId>, total: u64) -> Self {
        Self {
            hits: QueryHits { ids, total },
        }
    }
}

#[async_trait]
impl SearchIndex for FixedHitsIndex {
    async fn upsert(
        &self,
        _namespace: &str,
        _id: DocId,
        _document: &IndexDocument,
    ) -> Result<(), IndexError> {
        Ok(())
    }

    async fn remove(&self, _namespace: &str, _id: DocId) -> Result<(), IndexError> {
        Ok(())
    }

    async fn query(
        &self,
        _namespace: &str,
        _text: &str,
        _offset: u64,
        _limit: u64,
    ) -> Result<QueryHits, IndexError> {
        Ok(self.hits.clone())
    }
}

/// A backend that cannot be reached.
pub struct DownIndex;

#[async_trait]
impl SearchIndex for DownIndex {
    async fn upsert(
        &self,
        _namespace: &str,
        _id: DocId,
        _document: &IndexDocument,
    ) -> Result<(), IndexError> {
        Err(IndexError::Unavailable("connection refused".to_string()))
    }

    async fn remove(&self, _namespace: &str, _id: DocId) -> Result<(), IndexError> {
        Err(IndexError::Unavailable("connection refused".to_string()))
    }

    async fn query(
        &self,
        _namespace: &str,
        _text: &str,
        _offset: u64,
        _limit: u64,
    ) -> Result<QueryHits, IndexError> {
        Err(IndexError::Unavailable("connection refused".to_string()))
    }
}

/// Delegates to the store and counts `find_by_ids` calls.
pub struct CountingProblemRepository {
    inner: SeaOrmProblemRepository,
    fetches: AtomicUsize,
}

impl CountingProblemRepository {
    pub fn new(inner: SeaOrmProblemRepository) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProblemRepository for CountingProblemRepository {
    async fn create(&self, new_problem: NewProblem) -> anyhow::Result<Committed<ProblemRecord>> {
        self.inner.create(new_problem).await
    }

    async fn update(
        &self,
        problem_id: ProblemId,
        update: UpdateProblem,
    ) -> anyhow::Result<Option<Committed<ProblemRecord>>> {
        self.inner.update(problem_id, update).await
    }

    async fn delete(
        &self,
        problem_id: ProblemId,
    ) -> anyhow::Result<Option<Committed<ProblemRecord>>> {
        self.inner.delete(problem_id).await
    }

    async fn find_by_id(&self, problem_id: ProblemId) -> anyhow::Result<Option<ProblemRecord>> {
        self.inner.find_by_id(problem_id).await
    }

    async fn find_by_link(&self, problem_link: &str) -> anyhow::Result<Option<ProblemRecord>> {
        self.inner.find_by_link(problem_link).await
    }

    async fn find_by_ids(&self, problem_ids: &[ProblemId]) -> anyhow::Result<Vec<ProblemRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_ids(problem_ids).await
    }

    async fn list_after(
        &self,
        after: Option<ProblemId>,
        limit: u64,
    ) -> anyhow::Result<Vec<ProblemRecord>> {
        self.inner.list_after(after, limit).await
    }
}

/// Keeps every password-reset token it is asked to deliver.
#[derive(Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    /// `(email, token)` pairs in delivery order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("notifier lock").clone()
    }
}

#[async_trait]
impl ResetNotifier for CapturingNotifier {
    async fn send_reset(&self, user: &UserRecord, token: &IssuedToken) -> anyhow::Result<()> {
        self.sent
            .lock()
            .expect("notifier lock")
            .push((user.email.clone(), token.token.clone()));
        Ok(())
    }
}
