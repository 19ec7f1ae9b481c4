use std::sync::Arc;

use probmark_core::domain::{ChangeSet, IndexDocument, Indexable};
use probmark_core::search::IndexError;
use tracing::{debug, info, warn};

use super::{SearchClient, WriteOutcome};
use crate::repository::{ProblemRecord, ProblemRepository};

/// Index writes performed for one change-set. Writes skipped because no
/// backend is configured are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub upserted: usize,
    pub removed: usize,
    /// Entities without a search capability.
    pub skipped: usize,
    /// Writes the backend failed and the fail-open policy dropped.
    pub failed: usize,
}

/// Outcome of a bulk reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub indexed: u64,
    pub failed: u64,
}

/// Replays committed change-sets into the search index.
#[derive(Clone)]
pub struct IndexSync {
    client: Arc<SearchClient>,
}

impl IndexSync {
    pub fn new(client: Arc<SearchClient>) -> Self {
        Self { client }
    }

    /// Upserts added and updated searchable entities and removes deleted
    /// ones. Call only after the transaction that produced `changes` has
    /// committed.
    #[tracing::instrument(skip_all, fields(changes = changes.len()))]
    pub async fn apply(&self, changes: &ChangeSet) -> Result<SyncReport, IndexError> {
        let mut report = SyncReport::default();

        for captured in changes.added().iter().chain(changes.updated()) {
            let Some(capability) = captured.searchable() else {
                report.skipped += 1;
                continue;
            };
            match self
                .client
                .add_to_index(capability.namespace, captured.id(), captured.document())
                .await?
            {
                WriteOutcome::Applied => report.upserted += 1,
                WriteOutcome::Dropped => report.failed += 1,
                WriteOutcome::Disabled => {}
            }
        }

        for captured in changes.deleted() {
            let Some(capability) = captured.searchable() else {
                report.skipped += 1;
                continue;
            };
            match self
                .client
                .remove_from_index(capability.namespace, captured.id())
                .await?
            {
                WriteOutcome::Applied => report.removed += 1,
                WriteOutcome::Dropped => report.failed += 1,
                WriteOutcome::Disabled => {}
            }
        }

        debug!(
            upserted = report.upserted,
            removed = report.removed,
            skipped = report.skipped,
            failed = report.failed,
            "change-set applied to search index"
        );
        Ok(report)
    }

    /// Rebuilds the problem namespace from every row in the store, in id
    /// order and `batch_size` rows at a time. Only rows the backend
    /// acknowledged count as indexed.
    #[tracing::instrument(skip(self, problems))]
    pub async fn reindex_problems(
        &self,
        problems: &dyn ProblemRepository,
        batch_size: u64,
    ) -> anyhow::Result<ReindexReport> {
        let mut report = ReindexReport::default();
        let Some(capability) = ProblemRecord::CAPABILITY else {
            return Ok(report);
        };
        let batch_size = batch_size.max(1);
        let mut after = None;

        loop {
            let batch = problems.list_after(after, batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            after = Some(last.id);

            for record in &batch {
                let document = IndexDocument::project(record, capability.fields);
                match self
                    .client
                    .add_to_index(capability.namespace, record.index_id(), &document)
                    .await?
                {
                    WriteOutcome::Applied => report.indexed += 1,
                    WriteOutcome::Dropped => report.failed += 1,
                    WriteOutcome::Disabled => {}
                }
            }

            if (batch.len() as u64) < batch_size {
                break;
            }
        }

        if report.failed > 0 {
            warn!(
                namespace = capability.namespace,
                indexed = report.indexed,
                failed = report.failed,
                "reindex finished with dropped writes"
            );
        } else {
            info!(namespace = capability.namespace, indexed = report.indexed, "reindex complete");
        }
        Ok(report)
    }
}
