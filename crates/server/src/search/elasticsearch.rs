use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use probmark_core::domain::{DocId, IndexDocument};
use probmark_core::search::{IndexError, QueryHits, SearchIndex};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// [`SearchIndex`] backed by an Elasticsearch cluster over its REST API.
///
/// Namespaces map one-to-one onto Elasticsearch indices.
#[derive(Clone)]
pub struct ElasticsearchIndex {
    http: reqwest::Client,
    base_url: String,
}

impl ElasticsearchIndex {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build elasticsearch http client")?;

        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn document_url(&self, namespace: &str, id: DocId) -> String {
        format!("{}/{namespace}/_doc/{id}", self.base_url)
    }

    fn search_url(&self, namespace: &str) -> String {
        format!("{}/{namespace}/_search", self.base_url)
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn upsert(
        &self,
        namespace: &str,
        id: DocId,
        document: &IndexDocument,
    ) -> Result<(), IndexError> {
        let response = self
            .http
            .put(self.document_url(namespace, id))
            .json(document.fields())
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response).await?;
        debug!(namespace, id, "document indexed");
        Ok(())
    }

    async fn remove(&self, namespace: &str, id: DocId) -> Result<(), IndexError> {
        let response = self
            .http
            .delete(self.document_url(namespace, id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        debug!(namespace, id, "document removed");
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> Result<QueryHits, IndexError> {
        let body = json!({
            "query": { "multi_match": { "query": text, "fields": ["*"] } },
            "from": offset,
            "size": limit,
        });

        let response = self
            .http
            .post(self.search_url(namespace))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        // The index is created lazily by the first upsert.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(QueryHits::empty());
        }
        let response = ensure_success(response).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(parsed.into_hits())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: Total,
    hits: Vec<Hit>,
}

/// Elasticsearch 7+ reports `{"value": n}`, older versions a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
}

impl SearchResponse {
    fn into_hits(self) -> QueryHits {
        let total = match self.hits.total {
            Total::Object { value } => value,
            Total::Count(value) => value,
        };
        // Documents not written by this service may carry non-numeric ids.
        let ids = self
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| hit.id.parse().ok())
            .collect();

        QueryHits { ids, total }
    }
}

fn transport_error(err: reqwest::Error) -> IndexError {
    IndexError::Unavailable(err.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(IndexError::Rejected {
        status: status.as_u16(),
        message,
    })
}
