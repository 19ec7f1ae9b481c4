//! In-process inverted index.
//!
//! Each namespace keeps one postings table per document field. Queries score
//! every field with BM25 and keep the best field score per document, the same
//! "best fields" behaviour as an Elasticsearch `multi_match` over `*`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::tokenizer::tokenize;
use super::{IndexError, QueryHits, SearchIndex};
use crate::domain::{DocId, IndexDocument};

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

#[derive(Debug, Default)]
struct FieldPostings {
    /// term → (doc → term frequency)
    postings: HashMap<String, HashMap<DocId, u32>>,
    lengths: HashMap<DocId, u32>,
    total_length: u64,
}

impl FieldPostings {
    fn add(&mut self, id: DocId, text: &str) {
        let tokens = tokenize(text);
        let length = tokens.len() as u32;

        for token in tokens {
            *self
                .postings
                .entry(token)
                .or_default()
                .entry(id)
                .or_insert(0) += 1;
        }
        self.lengths.insert(id, length);
        self.total_length += u64::from(length);
    }

    fn remove(&mut self, id: DocId) {
        let Some(length) = self.lengths.remove(&id) else {
            return;
        };
        self.total_length -= u64::from(length);
        self.postings.retain(|_, docs| {
            docs.remove(&id);
            !docs.is_empty()
        });
    }

    fn score(&self, terms: &[String]) -> HashMap<DocId, f32> {
        let mut scores = HashMap::new();
        let doc_count = self.lengths.len() as f32;
        if doc_count == 0.0 || self.total_length == 0 {
            return scores;
        }
        let avgdl = self.total_length as f32 / doc_count;

        for term in terms {
            let Some(docs) = self.postings.get(term) else {
                continue;
            };
            let df = docs.len() as f32;
            let idf = ((doc_count - df + 0.5) / (df + 0.5) + 1.0).ln();

            for (id, tf) in docs {
                let tf = *tf as f32;
                let dl = self.lengths.get(id).copied().unwrap_or(0) as f32;
                let tf_norm = (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avgdl));
                *scores.entry(*id).or_insert(0.0) += idf * tf_norm;
            }
        }
        scores
    }
}

#[derive(Debug, Default)]
struct Namespace {
    documents: HashMap<DocId, IndexDocument>,
    fields: HashMap<String, FieldPostings>,
}

impl Namespace {
    fn insert(&mut self, id: DocId, document: IndexDocument) {
        for (field, text) in document.fields() {
            self.fields.entry(field.clone()).or_default().add(id, text);
        }
        self.documents.insert(id, document);
    }

    fn remove(&mut self, id: DocId) -> bool {
        if self.documents.remove(&id).is_none() {
            return false;
        }
        for postings in self.fields.values_mut() {
            postings.remove(id);
        }
        self.fields.retain(|_, postings| !postings.lengths.is_empty());
        true
    }

    fn ranked(&self, text: &str) -> Vec<DocId> {
        let mut terms = tokenize(text);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut best: HashMap<DocId, f32> = HashMap::new();
        for postings in self.fields.values() {
            for (id, score) in postings.score(&terms) {
                let entry = best.entry(id).or_insert(score);
                if score > *entry {
                    *entry = score;
                }
            }
        }

        let mut ranked: Vec<(DocId, f32)> = best.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}

/// Thread-safe in-memory [`SearchIndex`].
#[derive(Debug, Default)]
pub struct MemoryIndex {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document(&self, namespace: &str, id: DocId) -> Option<IndexDocument> {
        let namespaces = self.namespaces.read().await;
        namespaces
            .get(namespace)
            .and_then(|ns| ns.documents.get(&id))
            .cloned()
    }

    /// Ids stored in `namespace`, ascending.
    pub async fn ids(&self, namespace: &str) -> Vec<DocId> {
        let namespaces = self.namespaces.read().await;
        let mut ids: Vec<DocId> = namespaces
            .get(namespace)
            .map(|ns| ns.documents.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub async fn len(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.read().await;
        namespaces.get(namespace).map_or(0, |ns| ns.documents.len())
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn upsert(
        &self,
        namespace: &str,
        id: DocId,
        document: &IndexDocument,
    ) -> Result<(), IndexError> {
        let mut namespaces = self.namespaces.write().await;
        let ns = namespaces.entry(namespace.to_string()).or_default();

        if ns.documents.get(&id) == Some(document) {
            return Ok(());
        }
        ns.remove(id);
        ns.insert(id, document.clone());
        Ok(())
    }

    async fn remove(&self, namespace: &str, id: DocId) -> Result<(), IndexError> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(ns) = namespaces.get_mut(namespace) {
            ns.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> Result<QueryHits, IndexError> {
        let namespaces = self.namespaces.read().await;
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(QueryHits::empty());
        };

        let ranked = ns.ranked(text);
        let total = ranked.len() as u64;
        let ids = ranked
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();

        Ok(QueryHits { ids, total })
    }
}
